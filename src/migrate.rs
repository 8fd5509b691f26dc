use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the cache schema on an open pool. Idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Resolution cache, keyed by the raw part number
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parts (
            part_number TEXT PRIMARY KEY,
            manufacturer TEXT NOT NULL,
            mounting_type TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            product_url TEXT,
            datasheet_url TEXT,
            quantity_available INTEGER NOT NULL DEFAULT 0,
            unit_price REAL NOT NULL DEFAULT 0,
            error TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Daily call-budget counter, one row per local calendar day
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_calls (
            call_date TEXT PRIMARY KEY,
            call_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_parts_manufacturer ON parts(manufacturer)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_parts_mounting_type ON parts(mounting_type)")
        .execute(pool)
        .await?;

    Ok(())
}
