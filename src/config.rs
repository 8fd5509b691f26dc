use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub client_id: String,
    /// Environment variable holding the OAuth bearer token. Token
    /// acquisition and refresh are handled outside this tool.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Daily ceiling the catalog service enforces on lookup calls.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: i64,
}

fn default_base_url() -> String {
    "https://api.digikey.com".to_string()
}
fn default_token_env() -> String {
    "DIGIKEY_ACCESS_TOKEN".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_daily_limit() -> i64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResolutionConfig {
    /// Minimum similarity for a fuzzy candidate to reach the reviewer.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    /// Maximum candidates presented for disambiguation.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    /// Records requested from the keyword search during the fuzzy stage.
    #[serde(default = "default_fuzzy_record_count")]
    pub fuzzy_record_count: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
            max_candidates: default_max_candidates(),
            fuzzy_record_count: default_fuzzy_record_count(),
        }
    }
}

fn default_min_similarity() -> f64 {
    0.6
}
fn default_max_candidates() -> usize {
    10
}
fn default_fuzzy_record_count() -> usize {
    15
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.catalog.client_id.trim().is_empty() {
        anyhow::bail!("catalog.client_id must not be empty");
    }

    if config.catalog.daily_limit < 1 {
        anyhow::bail!("catalog.daily_limit must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.resolution.min_similarity) {
        anyhow::bail!("resolution.min_similarity must be in [0.0, 1.0]");
    }

    if config.resolution.max_candidates < 1 {
        anyhow::bail!("resolution.max_candidates must be >= 1");
    }

    if config.resolution.fuzzy_record_count < 1 {
        anyhow::bail!("resolution.fuzzy_record_count must be >= 1");
    }

    Ok(config)
}
