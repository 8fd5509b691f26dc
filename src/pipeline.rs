//! The lookup-resolution pipeline.
//!
//! Given a raw, possibly malformed part number, runs an ordered chain of
//! fallback strategies, each short-circuiting on success:
//!
//! 1. cache hit (success *or* prior failure) returns with zero remote calls
//! 2. exact remote lookup on the raw string
//! 3. cleanup retry when stripping newlines/tabs changes the string
//! 4. fuzzy keyword search, scored and filtered, then reviewer choice
//! 5. manual escape hatch (corrected string / skip / cancel)
//!
//! Every remote attempt bumps the daily call counter exactly once, whatever
//! its outcome. Failures are cached too, so a part that failed once is not
//! re-queried across rows or future runs. Whatever the catalog resolved,
//! the cached record is keyed by the **raw** identifier, so the next run's
//! cache check on the same cell text hits directly.
//!
//! A quota signal from the catalog aborts the pipeline immediately and
//! propagates as [`ResolveError::Quota`]; transient remote and storage
//! errors never cross this module's boundary.

use crate::catalog::{CatalogClient, CatalogError};
use crate::config::ResolutionConfig;
use crate::models::{CandidateMatch, ResolutionRecord};
use crate::review::Reviewer;
use crate::similarity;
use crate::store::CacheStore;

/// Terminal pipeline error. Only quota exhaustion is fatal.
#[derive(Debug)]
pub enum ResolveError {
    Quota { retry_after: Option<u64> },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::Quota { retry_after } => match retry_after {
                Some(secs) => write!(f, "daily call quota exceeded (retry after {}s)", secs),
                None => write!(f, "daily call quota exceeded"),
            },
        }
    }
}

impl std::error::Error for ResolveError {}

/// Pipeline output: the record plus how many remote calls it cost.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: ResolutionRecord,
    pub remote_calls: u32,
}

/// Safe string cleanup: trim, then strip embedded newline, carriage-return
/// and tab characters. Embedded spaces are left alone.
pub fn clean_part_number(raw: &str) -> String {
    raw.trim().replace(['\n', '\r', '\t'], "")
}

/// Resolve one identifier through the full fallback chain.
///
/// `row` is only used to give the reviewer context. Returns the resolved
/// (or synthesized not-found) record and the number of remote calls made.
pub async fn resolve_part(
    store: &CacheStore,
    client: &dyn CatalogClient,
    reviewer: &dyn Reviewer,
    opts: &ResolutionConfig,
    raw: &str,
    row: usize,
) -> Result<Resolution, ResolveError> {
    // Stage 1: cache. A cached failure also short-circuits; re-querying a
    // known-bad identifier would spend budget for nothing.
    match store.get(raw).await {
        Ok(Some(record)) => {
            return Ok(Resolution {
                record,
                remote_calls: 0,
            })
        }
        Ok(None) => {}
        Err(e) => eprintln!("cache read failed for '{}': {}", raw.escape_debug(), e),
    }

    let mut remote_calls = 0u32;

    // Stage 2: exact remote lookup on the raw string.
    let stage2 = attempt_lookup(store, client, raw, &mut remote_calls).await?;
    let stage2 = rekey(stage2, raw);
    put_advisory(store, &stage2).await;
    if !stage2.is_failed() {
        return Ok(Resolution {
            record: stage2,
            remote_calls,
        });
    }
    let failure = stage2;

    // Stage 3: cleanup retry, only when cleanup actually changed something.
    let cleaned = clean_part_number(raw);
    if cleaned != raw {
        let retried = attempt_lookup(store, client, &cleaned, &mut remote_calls).await?;
        let retried = rekey(retried, raw);
        put_advisory(store, &retried).await;
        if !retried.is_failed() {
            return Ok(Resolution {
                record: retried,
                remote_calls,
            });
        }
    }

    // Stage 4: fuzzy candidate search on the original, uncleaned string.
    remote_calls += 1;
    increment_advisory(store).await;
    match client.lookup_many(raw, opts.fuzzy_record_count).await {
        Ok(found) => {
            let candidates = rank_candidates(raw, found, opts);
            if !candidates.is_empty() {
                let choice = match reviewer.choose_candidate(raw, row, &candidates).await {
                    Ok(choice) => choice,
                    Err(e) => {
                        eprintln!("candidate selection failed: {}", e);
                        None
                    }
                };
                if let Some(chosen) = choice {
                    let chosen = rekey(chosen, raw);
                    put_advisory(store, &chosen).await;
                    return Ok(Resolution {
                        record: chosen,
                        remote_calls,
                    });
                }
            }
        }
        Err(CatalogError::Quota { retry_after }) => {
            return Err(ResolveError::Quota { retry_after })
        }
        Err(CatalogError::Transport(msg)) => {
            eprintln!("fuzzy search failed for '{}': {}", raw.escape_debug(), msg);
        }
    }

    // Stage 5: manual escape hatch. Never issues remote calls: a corrected
    // string is for the human's own web search, not another catalog query.
    let decision = match reviewer.resolve_manually(raw, row).await {
        Ok(decision) => decision,
        Err(e) => {
            eprintln!("manual review failed: {}", e);
            crate::review::ManualDecision::cancel()
        }
    };

    // Stage 2 always left a failure record behind; reuse it as the final
    // outcome rather than synthesizing a fresh placeholder.
    let record = failure;

    // Persist the final failure once more when the reviewer settled it and
    // we actually spent budget; overwriting an identical record is harmless.
    // A cancel leaves the cache exactly as stage 2 left it.
    if decision.corrected.is_some() && remote_calls > 0 {
        put_advisory(store, &record).await;
    }

    Ok(Resolution {
        record,
        remote_calls,
    })
}

/// One single-item remote attempt: counts against the budget whatever the
/// outcome, converts transport errors to a failure record, propagates quota.
async fn attempt_lookup(
    store: &CacheStore,
    client: &dyn CatalogClient,
    query: &str,
    remote_calls: &mut u32,
) -> Result<ResolutionRecord, ResolveError> {
    *remote_calls += 1;
    increment_advisory(store).await;

    match client.lookup_one(query).await {
        Ok(record) => Ok(record),
        Err(CatalogError::Quota { retry_after }) => Err(ResolveError::Quota { retry_after }),
        Err(CatalogError::Transport(msg)) => {
            eprintln!("lookup failed for '{}': {}", query.escape_debug(), msg);
            Ok(ResolutionRecord::lookup_failed(query, msg))
        }
    }
}

/// Score, filter, sort and truncate fuzzy-search results.
fn rank_candidates(
    raw: &str,
    found: Vec<ResolutionRecord>,
    opts: &ResolutionConfig,
) -> Vec<CandidateMatch> {
    let mut candidates: Vec<CandidateMatch> = found
        .into_iter()
        .map(|record| {
            let score = similarity::score(raw, &record.part_number);
            CandidateMatch { record, score }
        })
        .filter(|c| c.score >= opts.min_similarity)
        .collect();

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(opts.max_candidates);
    candidates
}

/// Key the record by the raw identifier the caller asked about.
fn rekey(mut record: ResolutionRecord, raw: &str) -> ResolutionRecord {
    record.part_number = raw.to_string();
    record
}

async fn put_advisory(store: &CacheStore, record: &ResolutionRecord) {
    if let Err(e) = store.put(record).await {
        eprintln!(
            "cache write failed for '{}': {}",
            record.part_number.escape_debug(),
            e
        );
    }
}

async fn increment_advisory(store: &CacheStore) {
    if let Err(e) = store.increment_daily_calls().await {
        eprintln!("call counter increment failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolutionConfig;
    use crate::models::SourceKind;

    #[test]
    fn cleanup_strips_control_characters() {
        assert_eq!(clean_part_number("ABC\t123\n"), "ABC123");
        assert_eq!(clean_part_number("  LM358  "), "LM358");
        assert_eq!(clean_part_number("A\r\nB"), "AB");
    }

    #[test]
    fn cleanup_preserves_embedded_spaces() {
        assert_eq!(clean_part_number("ABC 123"), "ABC 123");
    }

    #[test]
    fn cleanup_is_identity_on_clean_input() {
        assert_eq!(clean_part_number("LM358N"), "LM358N");
    }

    fn record(part: &str) -> ResolutionRecord {
        let now = 0;
        ResolutionRecord {
            part_number: part.to_string(),
            manufacturer: "Acme".to_string(),
            mounting_type: "SMD".to_string(),
            description: String::new(),
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

    #[test]
    fn candidate_floor_is_inclusive() {
        let opts = ResolutionConfig::default();

        // 59 matching + 41 differing characters over length 100: score 0.59
        let below: String = "a".repeat(59) + &"b".repeat(41);
        // 60 matching + 40 differing: score 0.60 exactly
        let at: String = "a".repeat(60) + &"b".repeat(40);
        let query = "a".repeat(100);

        let ranked = rank_candidates(
            &query,
            vec![record(&below), record(&at)],
            &opts,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record.part_number, at);
    }

    #[test]
    fn candidates_sorted_and_truncated() {
        let opts = ResolutionConfig {
            max_candidates: 2,
            ..Default::default()
        };
        let ranked = rank_candidates(
            "LM358N",
            vec![record("LM358X"), record("LM358N"), record("LM358NX")],
            &opts,
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].record.part_number, "LM358N");
        assert!(ranked[0].score >= ranked[1].score);
    }
}
