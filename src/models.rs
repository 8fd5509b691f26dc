//! Core data models for part-number resolution.
//!
//! These types represent the cached resolution records and transient fuzzy
//! candidates that flow through the lookup pipeline.

use serde::Serialize;

/// Manufacturer sentinel for "the catalog had no match".
pub const NOT_FOUND: &str = "NOT_FOUND";
/// Manufacturer sentinel for "the lookup itself errored".
pub const LOOKUP_FAILED: &str = "LOOKUP_FAILED";
/// Manufacturer sentinel for "the catalog API returned an error payload".
pub const API_ERROR: &str = "API_ERROR";

/// Placeholder value for fields the catalog did not populate.
pub const NA: &str = "N/A";

/// Where a resolution record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Read back from the local cache; no network involved.
    Cache,
    /// Produced by a remote catalog call in this run.
    Remote,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Cache => "cache",
            SourceKind::Remote => "remote",
        }
    }
}

/// One identifier's resolved (or failed) state.
///
/// `part_number` is the primary key: records are cached keyed by the raw
/// identifier the caller asked about, so future lookups on the same raw
/// string hit the cache directly even when the catalog resolved a cleaned
/// or fuzzy-matched variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionRecord {
    pub part_number: String,
    pub manufacturer: String,
    pub mounting_type: String,
    pub description: String,
    pub product_url: Option<String>,
    pub datasheet_url: Option<String>,
    pub quantity_available: i64,
    pub unit_price: f64,
    pub source: SourceKind,
    /// Populated when a transient remote error was converted into a failure record.
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ResolutionRecord {
    /// Default "no match" placeholder for an identifier.
    pub fn not_found(part_number: &str) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            part_number: part_number.to_string(),
            manufacturer: NOT_FOUND.to_string(),
            mounting_type: NA.to_string(),
            description: "No catalog match for this part number.".to_string(),
            product_url: None,
            datasheet_url: None,
            quantity_available: 0,
            unit_price: 0.0,
            source: SourceKind::Remote,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Failure record for a lookup that errored before producing a result.
    pub fn lookup_failed(part_number: &str, error: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            part_number: part_number.to_string(),
            manufacturer: LOOKUP_FAILED.to_string(),
            mounting_type: LOOKUP_FAILED.to_string(),
            description: NA.to_string(),
            product_url: None,
            datasheet_url: None,
            quantity_available: 0,
            unit_price: 0.0,
            source: SourceKind::Remote,
            error: Some(error),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this record represents a failed resolution.
    ///
    /// A record is failed when its manufacturer carries one of the sentinel
    /// values or an error was recorded alongside it.
    pub fn is_failed(&self) -> bool {
        if self.error.is_some() {
            return true;
        }
        matches!(
            self.manufacturer.as_str(),
            NOT_FOUND | LOOKUP_FAILED | API_ERROR
        )
    }
}

/// A fuzzy-search candidate paired with its similarity to the query.
///
/// Transient: produced during the fuzzy fallback stage and discarded after
/// the reviewer's decision. Never persisted as-is.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateMatch {
    pub record: ResolutionRecord,
    /// Similarity score in `[0, 1]` relative to the original query.
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_failed() {
        assert!(ResolutionRecord::not_found("X1").is_failed());
    }

    #[test]
    fn lookup_failed_is_failed() {
        assert!(ResolutionRecord::lookup_failed("X1", "timeout".into()).is_failed());
    }

    #[test]
    fn error_field_marks_failure() {
        let mut rec = ResolutionRecord::not_found("X1");
        rec.manufacturer = "Acme".to_string();
        assert!(!rec.is_failed());
        rec.error = Some("boom".to_string());
        assert!(rec.is_failed());
    }
}
