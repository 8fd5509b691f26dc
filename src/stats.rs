//! Cache statistics and call-budget overview.
//!
//! Provides a quick summary of what's cached: resolved vs failed record
//! counts, manufacturer spread, and recent daily call usage against the
//! configured ceiling. Used by `pns stats` to answer "how much budget is
//! left today" before starting a batch run.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::models::{API_ERROR, LOOKUP_FAILED, NA, NOT_FOUND};
use crate::store::CacheStore;

/// Cached-record counts. Failure classification matches
/// [`crate::models::ResolutionRecord::is_failed`]: an error field or a
/// sentinel manufacturer.
struct CacheSummary {
    total_parts: i64,
    failed_parts: i64,
    manufacturers: i64,
    mounting_types: i64,
}

async fn summarize(pool: &SqlitePool) -> Result<CacheSummary> {
    let failed = format!(
        "error IS NOT NULL OR manufacturer IN ('{}', '{}', '{}')",
        NOT_FOUND, LOOKUP_FAILED, API_ERROR
    );

    let total_parts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parts")
        .fetch_one(pool)
        .await?;

    let failed_parts: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM parts WHERE {}", failed))
            .fetch_one(pool)
            .await?;

    let manufacturers: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(DISTINCT manufacturer) FROM parts WHERE NOT ({})",
        failed
    ))
    .fetch_one(pool)
    .await?;

    let mounting_types: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(DISTINCT mounting_type) FROM parts WHERE NOT ({}) AND mounting_type != '{}'",
        failed, NA
    ))
    .fetch_one(pool)
    .await?;

    Ok(CacheSummary {
        total_parts,
        failed_parts,
        manufacturers,
        mounting_types,
    })
}

/// Run the stats command: query the cache and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = CacheStore::new(pool.clone());

    let summary = summarize(&pool).await?;
    let today = store.today_calls().await?;
    let history = store.call_history(7).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Part Scout — Cache Stats");
    println!("========================");
    println!();
    println!("  Database:      {}", config.db.path.display());
    println!("  Size:          {}", format_bytes(db_size));
    println!();
    println!("  Parts cached:  {}", summary.total_parts);
    println!(
        "  Resolved:      {} / {} ({}%)",
        summary.total_parts - summary.failed_parts,
        summary.total_parts,
        if summary.total_parts > 0 {
            ((summary.total_parts - summary.failed_parts) * 100) / summary.total_parts
        } else {
            0
        }
    );
    println!("  Failed:        {}", summary.failed_parts);
    println!("  Manufacturers: {}", summary.manufacturers);
    println!("  Mount types:   {}", summary.mounting_types);
    println!();
    println!(
        "  Calls today:   {} / {}",
        today, config.catalog.daily_limit
    );

    if !history.is_empty() {
        println!();
        println!("  Recent days:");
        println!("  {:<12} {:>8}", "DATE", "CALLS");
        println!("  {}", "-".repeat(21));
        for (date, count) in &history {
            println!("  {:<12} {:>8}", date, count);
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
