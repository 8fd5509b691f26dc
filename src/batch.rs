//! Batch resolution across a column of part numbers.
//!
//! Drives the pipeline over an ordered sequence of cells, forward-only from
//! a starting row. Clean cache hits bypass the pipeline entirely; blank
//! cells are skipped without counting toward the progress total. A quota
//! signal stops the run immediately, keeping everything resolved so far.

use anyhow::Result;

use crate::catalog::CatalogClient;
use crate::config::ResolutionConfig;
use crate::models::ResolutionRecord;
use crate::pipeline::{self, ResolveError};
use crate::progress::{BatchProgressEvent, BatchProgressReporter};
use crate::review::Reviewer;
use crate::sheet::SheetCell;
use crate::store::CacheStore;

/// Why a batch run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// All rows were processed.
    Completed,
    /// The catalog's daily quota was exhausted at `row`.
    QuotaExhausted {
        row: usize,
        retry_after: Option<u64>,
    },
}

/// One resolved row.
#[derive(Debug, Clone)]
pub struct RowResolution {
    pub row: usize,
    pub record: ResolutionRecord,
}

/// Aggregated result of a batch run. Partial on quota exhaustion.
#[derive(Debug)]
pub struct BatchReport {
    pub records: Vec<RowResolution>,
    pub cache_hits: u64,
    pub remote_calls: u64,
    pub stop: StopReason,
    /// Best-effort estimate of calls left in today's budget.
    pub remaining_quota: i64,
}

/// Blank cells and the textual residue of missing spreadsheet cells.
fn is_blank(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// Resolve every non-blank cell at or after `start_row`, in order.
///
/// One identifier is taken through the full pipeline (including any human
/// interaction) before the next is started; there is no parallel dispatch.
pub async fn run_batch(
    store: &CacheStore,
    client: &dyn CatalogClient,
    reviewer: &dyn Reviewer,
    opts: &ResolutionConfig,
    daily_limit: i64,
    cells: &[SheetCell],
    start_row: usize,
    limit: Option<usize>,
    progress: &dyn BatchProgressReporter,
) -> Result<BatchReport> {
    let mut pending: Vec<&SheetCell> = cells
        .iter()
        .filter(|cell| cell.row >= start_row && !is_blank(&cell.text))
        .collect();
    if let Some(lim) = limit {
        pending.truncate(lim);
    }
    let total = pending.len() as u64;

    let mut records = Vec::new();
    let mut cache_hits = 0u64;
    let mut remote_calls = 0u64;
    let mut stop = StopReason::Completed;

    for (i, cell) in pending.iter().enumerate() {
        progress.report(BatchProgressEvent::Resolving {
            part: cell.text.clone(),
            row: cell.row,
            n: (i + 1) as u64,
            total,
            cache_hits,
            remote_calls,
        });

        // Clean cache hits are classified here for the counters; anything
        // else falls through to the pipeline, whose own cache stage returns
        // cached failures without spending budget.
        match store.get(&cell.text).await {
            Ok(Some(record)) if !record.is_failed() => {
                cache_hits += 1;
                records.push(RowResolution {
                    row: cell.row,
                    record,
                });
                continue;
            }
            Ok(_) => {}
            Err(e) => eprintln!("cache read failed for row {}: {}", cell.row, e),
        }

        match pipeline::resolve_part(store, client, reviewer, opts, &cell.text, cell.row).await {
            Ok(resolution) => {
                if resolution.remote_calls == 0 {
                    cache_hits += 1;
                }
                remote_calls += u64::from(resolution.remote_calls);
                records.push(RowResolution {
                    row: cell.row,
                    record: resolution.record,
                });
            }
            Err(ResolveError::Quota { retry_after }) => {
                stop = StopReason::QuotaExhausted {
                    row: cell.row,
                    retry_after,
                };
                break;
            }
        }
    }

    let today = store.today_calls().await.unwrap_or(0);
    let remaining_quota = (daily_limit - today).max(0);

    Ok(BatchReport {
        records,
        cache_hits,
        remote_calls,
        stop,
        remaining_quota,
    })
}

/// Print the end-of-run summary in the same shape whether the run finished
/// or was cut short by the quota.
pub fn print_report(source: &str, report: &BatchReport, daily_limit: i64) {
    println!("batch {}", source);
    println!("  resolved: {} records", report.records.len());
    println!("  cache hits: {}", report.cache_hits);
    println!("  remote calls: {}", report.remote_calls);
    println!(
        "  remaining quota today: {} / {}",
        report.remaining_quota, daily_limit
    );
    match &report.stop {
        StopReason::Completed => println!("ok"),
        StopReason::QuotaExhausted { row, retry_after } => {
            match retry_after {
                Some(secs) => println!(
                    "stopped: quota exhausted at row {} (retry after {})",
                    row,
                    format_duration(*secs)
                ),
                None => println!("stopped: quota exhausted at row {}", row),
            };
        }
    }
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("~{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("~{}m", minutes)
    } else {
        format!("{}s", secs)
    }
}
