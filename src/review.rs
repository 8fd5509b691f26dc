//! Human interaction surface for ambiguous lookups.
//!
//! The pipeline suspends for a human at exactly two points: picking one
//! fuzzy candidate, and deciding what to do with an identifier nothing
//! matched. Both are behind the [`Reviewer`] trait so headless runs and
//! tests can substitute an automatic policy ([`AutoSkip`]).
//!
//! Prompts go to **stderr** so stdout remains parseable for scripts.

use anyhow::Result;
use async_trait::async_trait;
use std::io::{BufRead, Write};

use crate::models::{CandidateMatch, ResolutionRecord};

/// Outcome of the manual escape hatch.
///
/// `corrected = None` means the reviewer cancelled. A corrected string with
/// `web_search = true` means they intend to chase the part outside the
/// catalog; the pipeline records a not-found outcome and makes no further
/// remote calls either way.
#[derive(Debug, Clone)]
pub struct ManualDecision {
    pub corrected: Option<String>,
    pub web_search: bool,
}

impl ManualDecision {
    pub fn cancel() -> Self {
        Self {
            corrected: None,
            web_search: false,
        }
    }
}

/// Blocking decision points the pipeline depends on.
#[async_trait]
pub trait Reviewer: Send + Sync {
    /// Present scored candidates for a single choice. `None` = no choice.
    async fn choose_candidate(
        &self,
        original: &str,
        row: usize,
        candidates: &[CandidateMatch],
    ) -> Result<Option<ResolutionRecord>>;

    /// Offer correction or explicit skip for an identifier nothing matched.
    async fn resolve_manually(&self, original: &str, row: usize) -> Result<ManualDecision>;
}

/// Terminal reviewer: numbered candidate list and line-oriented prompts.
pub struct PromptReviewer;

#[async_trait]
impl Reviewer for PromptReviewer {
    async fn choose_candidate(
        &self,
        original: &str,
        row: usize,
        candidates: &[CandidateMatch],
    ) -> Result<Option<ResolutionRecord>> {
        let mut err = std::io::stderr().lock();
        writeln!(err)?;
        writeln!(
            err,
            "Similar parts for '{}' (row {}):",
            original.escape_debug(),
            row
        )?;
        writeln!(
            err,
            "  {:>3}  {:>6}  {:<24} {:<20} {:<14} {}",
            "#", "SCORE", "PART", "MANUFACTURER", "MOUNTING", "DESCRIPTION"
        )?;
        for (i, cand) in candidates.iter().enumerate() {
            writeln!(
                err,
                "  {:>3}  {:>5.0}%  {:<24} {:<20} {:<14} {}",
                i + 1,
                cand.score * 100.0,
                truncate(&cand.record.part_number, 24),
                truncate(&cand.record.manufacturer, 20),
                truncate(&cand.record.mounting_type, 14),
                truncate(&cand.record.description, 40),
            )?;
        }
        write!(
            err,
            "Select 1-{} or press Enter to skip: ",
            candidates.len()
        )?;
        err.flush()?;
        drop(err);

        let line = read_line()?;
        let choice = line.trim().parse::<usize>().ok();
        match choice {
            Some(n) if n >= 1 && n <= candidates.len() => {
                Ok(Some(candidates[n - 1].record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn resolve_manually(&self, original: &str, row: usize) -> Result<ManualDecision> {
        let mut err = std::io::stderr().lock();
        writeln!(err)?;
        writeln!(
            err,
            "No catalog match for '{}' (row {}).",
            original.escape_debug(),
            row
        )?;
        writeln!(err, "  [w] enter a corrected part number for a web search")?;
        writeln!(err, "  [s] skip, record as not found")?;
        write!(err, "  [Enter] cancel: ")?;
        err.flush()?;
        drop(err);

        match read_line()?.trim().to_lowercase().as_str() {
            "w" => {
                let mut err = std::io::stderr().lock();
                write!(err, "Corrected part number: ")?;
                err.flush()?;
                drop(err);
                let corrected = read_line()?.trim().to_string();
                if corrected.is_empty() {
                    return Ok(ManualDecision::cancel());
                }
                eprintln!(
                    "Search the web for '{}'; the cache keeps a not-found record meanwhile.",
                    corrected
                );
                Ok(ManualDecision {
                    corrected: Some(corrected),
                    web_search: true,
                })
            }
            "s" => Ok(ManualDecision {
                corrected: Some(original.to_string()),
                web_search: false,
            }),
            _ => Ok(ManualDecision::cancel()),
        }
    }
}

/// Automatic policy for headless runs: never picks, always cancels.
pub struct AutoSkip;

#[async_trait]
impl Reviewer for AutoSkip {
    async fn choose_candidate(
        &self,
        _original: &str,
        _row: usize,
        _candidates: &[CandidateMatch],
    ) -> Result<Option<ResolutionRecord>> {
        Ok(None)
    }

    async fn resolve_manually(&self, _original: &str, _row: usize) -> Result<ManualDecision> {
        Ok(ManualDecision::cancel())
    }
}

fn read_line() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_passthrough() {
        assert_eq!(truncate("LM358", 24), "LM358");
    }

    #[test]
    fn truncate_long_ellipsis() {
        let out = truncate("ABCDEFGHIJ", 5);
        assert_eq!(out.chars().count(), 5);
        assert!(out.ends_with('…'));
    }
}
