//! SQLite connection for the parts cache.
//!
//! One pool per command invocation. Resolution is sequential (a batch run
//! holds at most one in-flight lookup), so the pool stays small: one writer
//! plus room for a concurrent `pns stats` read. WAL and a busy timeout keep
//! a stats read from failing while a batch run holds the write lock, which
//! can last as long as a reviewer prompt sits unanswered.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::time::Duration;

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    // First run: the cache file's directory may not exist yet
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogConfig, DbConfig, ResolutionConfig};

    fn test_config(path: std::path::PathBuf) -> Config {
        Config {
            db: DbConfig { path },
            catalog: CatalogConfig {
                base_url: "https://api.digikey.com".to_string(),
                client_id: "test".to_string(),
                token_env: "DIGIKEY_ACCESS_TOKEN".to_string(),
                timeout_secs: 30,
                daily_limit: 1000,
            },
            resolution: ResolutionConfig::default(),
        }
    }

    #[tokio::test]
    async fn connect_creates_missing_parent_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("data").join("pns.sqlite");
        let config = test_config(path.clone());

        let pool = connect(&config).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();
        pool.close().await;
        assert!(path.exists());
    }
}
