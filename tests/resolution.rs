//! End-to-end pipeline tests against a temp SQLite cache and a scripted
//! in-memory catalog. No network, no prompts.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;

use partscout::catalog::{CatalogClient, CatalogError};
use partscout::config::ResolutionConfig;
use partscout::migrate;
use partscout::models::{CandidateMatch, ResolutionRecord, SourceKind, LOOKUP_FAILED};
use partscout::pipeline::{resolve_part, ResolveError};
use partscout::review::{AutoSkip, ManualDecision, Reviewer};
use partscout::store::CacheStore;

async fn test_store() -> (TempDir, CacheStore) {
    let tmp = TempDir::new().unwrap();
    let opts = SqliteConnectOptions::new()
        .filename(tmp.path().join("cache.sqlite"))
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(opts)
        .await
        .unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    (tmp, CacheStore::new(pool))
}

fn remote_record(part: &str, manufacturer: &str) -> ResolutionRecord {
    ResolutionRecord {
        part_number: part.to_string(),
        manufacturer: manufacturer.to_string(),
        mounting_type: "Through Hole".to_string(),
        description: "test part".to_string(),
        product_url: None,
        datasheet_url: None,
        quantity_available: 100,
        unit_price: 0.42,
        source: SourceKind::Remote,
        error: None,
        created_at: 0,
        updated_at: 0,
    }
}

/// Scripted catalog: exact hits from a map, a fixed fuzzy result list, and
/// switchable quota/transport failure modes. Records every query it sees.
#[derive(Default)]
struct FakeCatalog {
    exact: HashMap<String, ResolutionRecord>,
    fuzzy: Vec<ResolutionRecord>,
    quota: bool,
    transport: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeCatalog {
    fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn lookup_one(&self, query: &str) -> Result<ResolutionRecord, CatalogError> {
        self.calls.lock().unwrap().push(format!("one:{}", query));
        if self.quota {
            return Err(CatalogError::Quota {
                retry_after: Some(60),
            });
        }
        if self.transport {
            return Err(CatalogError::Transport("connection reset".to_string()));
        }
        Ok(self
            .exact
            .get(query)
            .cloned()
            .unwrap_or_else(|| ResolutionRecord::not_found(query)))
    }

    async fn lookup_many(
        &self,
        query: &str,
        _max_count: usize,
    ) -> Result<Vec<ResolutionRecord>, CatalogError> {
        self.calls.lock().unwrap().push(format!("many:{}", query));
        if self.quota {
            return Err(CatalogError::Quota {
                retry_after: Some(60),
            });
        }
        if self.transport {
            return Err(CatalogError::Transport("connection reset".to_string()));
        }
        Ok(self.fuzzy.clone())
    }
}

/// Reviewer that always takes the top-ranked candidate.
struct PickFirst;

#[async_trait]
impl Reviewer for PickFirst {
    async fn choose_candidate(
        &self,
        _original: &str,
        _row: usize,
        candidates: &[CandidateMatch],
    ) -> anyhow::Result<Option<ResolutionRecord>> {
        Ok(candidates.first().map(|c| c.record.clone()))
    }

    async fn resolve_manually(&self, _original: &str, _row: usize) -> anyhow::Result<ManualDecision> {
        Ok(ManualDecision::cancel())
    }
}

#[tokio::test]
async fn exact_hit_then_cache_hit() {
    let (_tmp, store) = test_store().await;
    let mut catalog = FakeCatalog::default();
    catalog
        .exact
        .insert("LM358N".to_string(), remote_record("LM358N", "Texas Instruments"));
    let opts = ResolutionConfig::default();

    let first = resolve_part(&store, &catalog, &AutoSkip, &opts, "LM358N", 1)
        .await
        .unwrap();
    assert_eq!(first.remote_calls, 1);
    assert_eq!(first.record.manufacturer, "Texas Instruments");
    assert_eq!(first.record.source, SourceKind::Remote);

    // Same identifier again: served from cache, no new catalog traffic.
    let second = resolve_part(&store, &catalog, &AutoSkip, &opts, "LM358N", 2)
        .await
        .unwrap();
    assert_eq!(second.remote_calls, 0);
    assert_eq!(second.record.source, SourceKind::Cache);
    assert_eq!(catalog.call_log(), vec!["one:LM358N"]);
    assert_eq!(store.today_calls().await.unwrap(), 1);
}

#[tokio::test]
async fn cleanup_retry_caches_under_raw_key() {
    let (_tmp, store) = test_store().await;
    let mut catalog = FakeCatalog::default();
    // Only the cleaned form exists in the catalog.
    catalog
        .exact
        .insert("ABC123".to_string(), remote_record("ABC123", "Acme"));
    let opts = ResolutionConfig::default();

    let raw = "ABC\t123\n";
    let out = resolve_part(&store, &catalog, &AutoSkip, &opts, raw, 1)
        .await
        .unwrap();

    assert_eq!(out.remote_calls, 2);
    assert_eq!(out.record.manufacturer, "Acme");
    assert_eq!(out.record.part_number, raw);
    assert_eq!(
        catalog.call_log(),
        vec!["one:ABC\t123\n".to_string(), "one:ABC123".to_string()]
    );

    // The record is cached under the raw identifier, so the next run on the
    // same cell text is a direct cache hit.
    let cached = store.get(raw).await.unwrap().unwrap();
    assert_eq!(cached.manufacturer, "Acme");
    assert!(!cached.is_failed());

    let again = resolve_part(&store, &catalog, &AutoSkip, &opts, raw, 1)
        .await
        .unwrap();
    assert_eq!(again.remote_calls, 0);
    assert_eq!(store.today_calls().await.unwrap(), 2);
}

#[tokio::test]
async fn cached_failure_short_circuits() {
    let (_tmp, store) = test_store().await;
    store
        .put(&ResolutionRecord::not_found("GHOST-1"))
        .await
        .unwrap();
    let catalog = FakeCatalog::default();
    let opts = ResolutionConfig::default();

    let out = resolve_part(&store, &catalog, &AutoSkip, &opts, "GHOST-1", 1)
        .await
        .unwrap();
    assert_eq!(out.remote_calls, 0);
    assert!(out.record.is_failed());
    assert!(catalog.call_log().is_empty());
}

#[tokio::test]
async fn fuzzy_candidate_resolves_and_rekeys() {
    let (_tmp, store) = test_store().await;
    let catalog = FakeCatalog {
        fuzzy: vec![
            remote_record("LM358N", "Texas Instruments"),
            remote_record("XJ-900", "Acme"),
        ],
        ..Default::default()
    };
    let opts = ResolutionConfig::default();

    // No exact hit, cleanup changes nothing, fuzzy search finds a close
    // variant; only the close one clears the similarity floor.
    let out = resolve_part(&store, &catalog, &PickFirst, &opts, "LM358M", 1)
        .await
        .unwrap();
    assert_eq!(out.remote_calls, 2);
    assert_eq!(out.record.manufacturer, "Texas Instruments");
    assert_eq!(out.record.part_number, "LM358M");
    assert_eq!(
        catalog.call_log(),
        vec!["one:LM358M".to_string(), "many:LM358M".to_string()]
    );

    let cached = store.get("LM358M").await.unwrap().unwrap();
    assert!(!cached.is_failed());
}

#[tokio::test]
async fn quota_aborts_and_still_counts_the_attempt() {
    let (_tmp, store) = test_store().await;
    let catalog = FakeCatalog {
        quota: true,
        ..Default::default()
    };
    let opts = ResolutionConfig::default();

    let err = resolve_part(&store, &catalog, &AutoSkip, &opts, "LM358N", 1)
        .await
        .unwrap_err();
    match err {
        ResolveError::Quota { retry_after } => assert_eq!(retry_after, Some(60)),
    }

    // The attempt was made before the server said no; it still spent budget.
    assert_eq!(store.today_calls().await.unwrap(), 1);
    // Nothing cached: a quota stop is not a resolution outcome.
    assert!(store.get("LM358N").await.unwrap().is_none());
}

#[tokio::test]
async fn transport_errors_become_failure_records() {
    let (_tmp, store) = test_store().await;
    let catalog = FakeCatalog {
        transport: true,
        ..Default::default()
    };
    let opts = ResolutionConfig::default();

    let out = resolve_part(&store, &catalog, &AutoSkip, &opts, "LM358N", 1)
        .await
        .unwrap();

    // Exact lookup and fuzzy search both failed; both count against budget.
    assert_eq!(out.remote_calls, 2);
    assert_eq!(store.today_calls().await.unwrap(), 2);
    assert_eq!(out.record.manufacturer, LOOKUP_FAILED);
    assert!(out.record.error.is_some());

    // The failure is cached so the next run skips the known-bad identifier.
    let cached = store.get("LM358N").await.unwrap().unwrap();
    assert!(cached.is_failed());
    let again = resolve_part(&store, &catalog, &AutoSkip, &opts, "LM358N", 1)
        .await
        .unwrap();
    assert_eq!(again.remote_calls, 0);
}

/// Reviewer that never picks a candidate but hands back a corrected part
/// number with web-search intent at the manual stage.
struct CorrectAndSearch;

#[async_trait]
impl Reviewer for CorrectAndSearch {
    async fn choose_candidate(
        &self,
        _original: &str,
        _row: usize,
        _candidates: &[CandidateMatch],
    ) -> anyhow::Result<Option<ResolutionRecord>> {
        Ok(None)
    }

    async fn resolve_manually(&self, _original: &str, _row: usize) -> anyhow::Result<ManualDecision> {
        Ok(ManualDecision {
            corrected: Some("LM358N".to_string()),
            web_search: true,
        })
    }
}

#[tokio::test]
async fn web_search_decision_records_failure_without_new_calls() {
    let (_tmp, store) = test_store().await;
    let catalog = FakeCatalog::default();
    let opts = ResolutionConfig::default();

    let out = resolve_part(&store, &catalog, &CorrectAndSearch, &opts, "BADPART", 1)
        .await
        .unwrap();

    // The corrected string is for the human's own web search; the manual
    // stage must not turn it into another catalog query.
    assert_eq!(out.remote_calls, 2);
    assert_eq!(
        catalog.call_log(),
        vec!["one:BADPART".to_string(), "many:BADPART".to_string()]
    );
    assert!(out.record.is_failed());
    assert_eq!(out.record.part_number, "BADPART");

    // The failure is cached under the original identifier.
    let cached = store.get("BADPART").await.unwrap().unwrap();
    assert!(cached.is_failed());
    assert!(store.get("LM358N").await.unwrap().is_none());
    assert_eq!(store.today_calls().await.unwrap(), 2);
}

#[tokio::test]
async fn daily_counter_accumulates_per_day() {
    let (_tmp, store) = test_store().await;
    assert_eq!(store.today_calls().await.unwrap(), 0);
    store.increment_daily_calls().await.unwrap();
    store.increment_daily_calls().await.unwrap();
    store.increment_daily_calls().await.unwrap();
    assert_eq!(store.today_calls().await.unwrap(), 3);

    let history = store.call_history(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].1, 3);
}
