//! Batch progress reporting.
//!
//! Reports observable progress during `pns batch` so users see which part is
//! being resolved, how much is left, and how the call budget is being spent.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a batch run.
#[derive(Clone, Debug)]
pub enum BatchProgressEvent {
    /// Reading cells from the input file; total not known yet.
    Loading { source: String },
    /// Resolving part `n` of `total`, with running counters.
    Resolving {
        part: String,
        row: usize,
        n: u64,
        total: u64,
        cache_hits: u64,
        remote_calls: u64,
    },
}

/// Reports batch progress. Implementations write to stderr (human or JSON).
pub trait BatchProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the batch runner.
    fn report(&self, event: BatchProgressEvent);
}

/// Human-friendly progress on stderr:
/// "resolve  12 / 48  LM358N (row 14)  cache 7 | api 5".
pub struct StderrProgress;

impl BatchProgressReporter for StderrProgress {
    fn report(&self, event: BatchProgressEvent) {
        let line = match &event {
            BatchProgressEvent::Loading { source } => {
                format!("batch {}  loading...\n", source)
            }
            BatchProgressEvent::Resolving {
                part,
                row,
                n,
                total,
                cache_hits,
                remote_calls,
            } => {
                format!(
                    "resolve  {} / {}  {} (row {})  cache {} | api {}\n",
                    format_number(*n),
                    format_number(*total),
                    part.escape_debug(),
                    row,
                    cache_hits,
                    remote_calls
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl BatchProgressReporter for JsonProgress {
    fn report(&self, event: BatchProgressEvent) {
        let obj = match &event {
            BatchProgressEvent::Loading { source } => serde_json::json!({
                "event": "progress",
                "phase": "loading",
                "source": source
            }),
            BatchProgressEvent::Resolving {
                part,
                row,
                n,
                total,
                cache_hits,
                remote_calls,
            } => serde_json::json!({
                "event": "progress",
                "phase": "resolving",
                "part": part,
                "row": row,
                "n": n,
                "total": total,
                "cache_hits": cache_hits,
                "remote_calls": remote_calls
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl BatchProgressReporter for NoProgress {
    fn report(&self, _event: BatchProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller can pass it to the batch runner.
    pub fn reporter(&self) -> Box<dyn BatchProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
