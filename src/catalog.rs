//! Remote catalog client abstraction and the DigiKey implementation.
//!
//! Defines the [`CatalogClient`] trait the resolution pipeline depends on,
//! and [`DigiKeyClient`], which issues keyword searches against the DigiKey
//! product API. The daily rate limit surfaces as a typed
//! [`CatalogError::Quota`] value rather than a panic or ad-hoc string, so
//! the batch runner can stop cleanly and report partial results.
//!
//! The bearer token is an explicit field handed to the constructor; there is
//! no ambient session state. Obtaining and refreshing the token is the
//! caller's concern.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::CatalogConfig;
use crate::models::{ResolutionRecord, SourceKind, NA};

/// Hard server-side cap on records per keyword search.
const MAX_RECORD_COUNT: usize = 50;

/// Errors a catalog lookup can raise to the pipeline.
#[derive(Debug)]
pub enum CatalogError {
    /// Daily call quota exhausted. Fatal to the current batch run.
    Quota { retry_after: Option<u64> },
    /// Network or response-shape problem. Converted to a failure record at
    /// the stage where it occurs; never crosses the pipeline boundary.
    Transport(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Quota { retry_after } => match retry_after {
                Some(secs) => write!(f, "daily call quota exceeded (retry after {}s)", secs),
                None => write!(f, "daily call quota exceeded"),
            },
            CatalogError::Transport(msg) => write!(f, "catalog request failed: {}", msg),
        }
    }
}

impl std::error::Error for CatalogError {}

/// A remote parts catalog the pipeline can query.
///
/// Both operations may fail with [`CatalogError::Quota`], which aborts the
/// pipeline call and the surrounding batch. Implementations are expected to
/// be deterministic per query within a single run; the pipeline handles
/// caching and budget accounting itself.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Single best match for a query. A "no match" outcome is returned as a
    /// sentinel record (see [`ResolutionRecord::is_failed`]), not an error.
    async fn lookup_one(&self, query: &str) -> Result<ResolutionRecord, CatalogError>;

    /// Multi-result keyword search, up to `max_count` records (server cap 50).
    /// Sentinel/no-match entries are filtered out of the returned list.
    async fn lookup_many(
        &self,
        query: &str,
        max_count: usize,
    ) -> Result<Vec<ResolutionRecord>, CatalogError>;
}

/// Catalog client for the DigiKey product search API.
pub struct DigiKeyClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    token: String,
}

impl DigiKeyClient {
    /// Build a client from config. The bearer token is read once from the
    /// environment variable named in `catalog.token_env`.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env).map_err(|_| {
            anyhow::anyhow!("{} environment variable not set", config.token_env)
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            token,
        })
    }

    /// Issue one keyword search and return the raw product records.
    async fn keyword_search(
        &self,
        keywords: &str,
        record_count: usize,
    ) -> Result<Vec<ResolutionRecord>, CatalogError> {
        let url = format!("{}/products/v4/search/keyword", self.base_url);

        let body = serde_json::json!({
            "Keywords": keywords,
            "RecordCount": record_count.min(MAX_RECORD_COUNT),
            "RecordStartPosition": 0,
        });

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .header("X-DIGIKEY-Client-Id", &self.client_id)
            .header("X-DIGIKEY-Locale-Site", "US")
            .header("X-DIGIKEY-Locale-Language", "en")
            .header("X-DIGIKEY-Locale-Currency", "USD")
            .json(&body)
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        let status = resp.status();

        if status.as_u16() == 429 {
            let retry_after = resp
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(CatalogError::Quota { retry_after });
        }

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(CatalogError::Transport(format!(
                "HTTP {}: {}",
                status, snippet
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        // Response shape has shifted across API versions; accept either key.
        let products = json
            .get("Products")
            .or_else(|| json.get("SearchResults"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(products
            .iter()
            .map(|p| product_to_record(p, keywords))
            .collect())
    }
}

#[async_trait]
impl CatalogClient for DigiKeyClient {
    async fn lookup_one(&self, query: &str) -> Result<ResolutionRecord, CatalogError> {
        let mut records = self.keyword_search(query, 1).await?;
        if records.is_empty() {
            return Ok(ResolutionRecord::not_found(query));
        }
        Ok(records.remove(0))
    }

    async fn lookup_many(
        &self,
        query: &str,
        max_count: usize,
    ) -> Result<Vec<ResolutionRecord>, CatalogError> {
        let records = self.keyword_search(query, max_count).await?;
        Ok(records.into_iter().filter(|r| !r.is_failed()).collect())
    }
}

/// Flatten one product object from the search response into a record.
///
/// The API nests manufacturer and description differently across versions,
/// so each field probes the known shapes before falling back to `N/A`.
fn product_to_record(product: &Value, query: &str) -> ResolutionRecord {
    let manufacturer = match product.get("Manufacturer") {
        Some(Value::Object(m)) => m
            .get("Name")
            .or_else(|| m.get("Value"))
            .and_then(|v| v.as_str())
            .unwrap_or(NA)
            .to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => NA.to_string(),
    };

    let description = extract_description(product).unwrap_or_else(|| NA.to_string());

    let part_number = product
        .get("ManufacturerProductNumber")
        .or_else(|| product.get("DigiKeyPartNumber"))
        .or_else(|| product.get("PartNumber"))
        .and_then(|v| v.as_str())
        .unwrap_or(query)
        .to_string();

    let product_url = product
        .get("ProductUrl")
        .or_else(|| product.get("Url"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let datasheet_url = product
        .get("PrimaryDatasheet")
        .or_else(|| product.get("DatasheetUrl"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let quantity_available = product
        .get("QuantityAvailable")
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
        .max(0);

    let unit_price = product
        .get("StandardPricing")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|tier| tier.get("UnitPrice"))
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
        .max(0.0);

    let mounting_type = extract_mounting_type(product).unwrap_or_else(|| NA.to_string());

    let now = chrono::Utc::now().timestamp();
    ResolutionRecord {
        part_number,
        manufacturer,
        mounting_type,
        description,
        product_url,
        datasheet_url,
        quantity_available,
        unit_price,
        source: SourceKind::Remote,
        error: None,
        created_at: now,
        updated_at: now,
    }
}

fn extract_description(product: &Value) -> Option<String> {
    for key in ["DetailedDescription", "Description"] {
        match product.get(key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Object(o)) => {
                for inner in ["DetailedDescription", "ProductDescription"] {
                    if let Some(s) = o.get(inner).and_then(|v| v.as_str()) {
                        if !s.is_empty() {
                            return Some(s.to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Mounting type lives in the parameter list, keyed by display text.
fn extract_mounting_type(product: &Value) -> Option<String> {
    let params = product.get("Parameters")?.as_array()?;
    for param in params {
        let name = param
            .get("ParameterText")
            .or_else(|| param.get("Parameter"))
            .or_else(|| param.get("Name"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if name == "Mounting Type" {
            return param
                .get("ValueText")
                .or_else(|| param.get("Value"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }
    }
    None
}
