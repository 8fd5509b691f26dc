//! Local resolution cache and daily call-budget counter.
//!
//! A durable mapping from (trimmed) part number to its last resolution,
//! plus a per-day counter of remote catalog calls. Never performs network
//! I/O. Storage failures are advisory: callers degrade reads to a cache
//! miss and log failed writes without blocking the resolution they hold.

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};

use crate::models::{ResolutionRecord, SourceKind};

#[derive(Clone)]
pub struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Exact-key lookup by trimmed part number. `None` when absent.
    pub async fn get(&self, part_number: &str) -> Result<Option<ResolutionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT part_number, manufacturer, mounting_type, description,
                   product_url, datasheet_url, quantity_available, unit_price,
                   error, created_at, updated_at
            FROM parts
            WHERE part_number = ?
            "#,
        )
        .bind(part_number.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ResolutionRecord {
            part_number: row.get("part_number"),
            manufacturer: row.get("manufacturer"),
            mounting_type: row.get("mounting_type"),
            description: row.get("description"),
            product_url: row.get("product_url"),
            datasheet_url: row.get("datasheet_url"),
            quantity_available: row.get("quantity_available"),
            unit_price: row.get("unit_price"),
            source: SourceKind::Cache,
            error: row.get("error"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    /// Upsert by part number. An existing row keeps its `created_at`;
    /// `updated_at` is set to now either way.
    pub async fn put(&self, record: &ResolutionRecord) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO parts (part_number, manufacturer, mounting_type, description,
                               product_url, datasheet_url, quantity_available, unit_price,
                               error, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(part_number) DO UPDATE SET
                manufacturer = excluded.manufacturer,
                mounting_type = excluded.mounting_type,
                description = excluded.description,
                product_url = excluded.product_url,
                datasheet_url = excluded.datasheet_url,
                quantity_available = excluded.quantity_available,
                unit_price = excluded.unit_price,
                error = excluded.error,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.part_number.trim())
        .bind(&record.manufacturer)
        .bind(&record.mounting_type)
        .bind(&record.description)
        .bind(&record.product_url)
        .bind(&record.datasheet_url)
        .bind(record.quantity_available)
        .bind(record.unit_price)
        .bind(&record.error)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically bump today's call counter, creating the day's row if absent.
    ///
    /// A single statement so repeated increments cannot race under
    /// concurrent batch runs.
    pub async fn increment_daily_calls(&self) -> Result<()> {
        let today = chrono::Local::now().date_naive().to_string();
        sqlx::query(
            r#"
            INSERT INTO api_calls (call_date, call_count) VALUES (?, 1)
            ON CONFLICT(call_date) DO UPDATE SET call_count = call_count + 1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Call count for a given day; 0 when no row exists.
    pub async fn daily_calls(&self, day: NaiveDate) -> Result<i64> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT call_count FROM api_calls WHERE call_date = ?")
                .bind(day.to_string())
                .fetch_optional(&self.pool)
                .await?;

        Ok(count.unwrap_or(0))
    }

    /// Call count for the day the process is running in.
    pub async fn today_calls(&self) -> Result<i64> {
        self.daily_calls(chrono::Local::now().date_naive()).await
    }

    /// Recent daily call counts, newest first.
    pub async fn call_history(&self, limit: i64) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT call_date, call_count FROM api_calls ORDER BY call_date DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("call_date"), row.get("call_count")))
            .collect())
    }
}
