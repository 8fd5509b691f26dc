//! # Part Scout CLI (`pns`)
//!
//! The `pns` binary resolves electronic part numbers against the DigiKey
//! catalog, one at a time or in batches from a spreadsheet column, backed by
//! a local SQLite cache and a daily call budget.
//!
//! ## Usage
//!
//! ```bash
//! pns --config ./config/pns.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pns init` | Create the SQLite cache and run schema migrations |
//! | `pns resolve <PART>` | Resolve one part number through the fallback chain |
//! | `pns batch <FILE>` | Resolve a column of parts from an .xlsx or text file |
//! | `pns cache get <PART>` | Show the cached record for a part, if any |
//! | `pns stats` | Cache contents and call-budget overview |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use partscout::batch;
use partscout::catalog::DigiKeyClient;
use partscout::config;
use partscout::db;
use partscout::migrate;
use partscout::models::ResolutionRecord;
use partscout::pipeline::{self, ResolveError};
use partscout::progress::{BatchProgressEvent, ProgressMode};
use partscout::review::{AutoSkip, PromptReviewer, Reviewer};
use partscout::sheet;
use partscout::stats;
use partscout::store::CacheStore;

/// Part Scout — resolve part numbers against the DigiKey catalog with a
/// local cache and a daily call budget.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pns.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pns",
    about = "Part Scout — batch part-number resolution against the DigiKey catalog",
    version,
    long_about = "Part Scout resolves messy part-number lists to catalog records through an \
    ordered fallback chain (cache, exact lookup, cleanup retry, fuzzy search with human \
    disambiguation, manual escape hatch). Every outcome is cached in SQLite so repeat runs \
    spend no API budget."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pns.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the cache database schema.
    ///
    /// Creates the SQLite file and all required tables (parts, api_calls).
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Resolve a single part number.
    ///
    /// Runs the full fallback chain and prints the resolved record.
    /// Interactive prompts appear on stderr; pass --no-prompt for
    /// headless use.
    Resolve {
        /// The part number to resolve (raw; cleanup happens internally).
        part: String,

        /// Never prompt; ambiguous lookups are recorded as not found.
        #[arg(long)]
        no_prompt: bool,
    },

    /// Resolve a column of part numbers from a file.
    ///
    /// Accepts an `.xlsx` workbook (first worksheet) or a plain text file
    /// with one part per line. Stops immediately when the catalog reports
    /// quota exhaustion, keeping everything resolved so far.
    Batch {
        /// Input file: .xlsx workbook or plain text list.
        file: PathBuf,

        /// Worksheet column letter holding the part numbers.
        #[arg(long, default_value = "A")]
        column: String,

        /// First row to process (1-based); earlier rows are skipped.
        #[arg(long, default_value_t = 1)]
        start_row: usize,

        /// Maximum number of non-blank cells to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Never prompt; ambiguous lookups are recorded as not found.
        #[arg(long)]
        no_prompt: bool,

        /// Progress output on stderr: `off`, `human`, or `json`.
        /// Defaults to `human` when stderr is a terminal, `off` otherwise.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Cache and call-budget overview.
    Stats,

    /// Inspect the local cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache inspection subcommands.
#[derive(Subcommand)]
enum CacheAction {
    /// Print the cached record for a part number, if any.
    Get {
        /// The part number to look up (trimmed before matching).
        part: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Resolve { part, no_prompt } => {
            let pool = db::connect(&cfg).await?;
            let store = CacheStore::new(pool.clone());
            let client = DigiKeyClient::new(&cfg.catalog)?;
            let reviewer: Box<dyn Reviewer> = if no_prompt {
                Box::new(AutoSkip)
            } else {
                Box::new(PromptReviewer)
            };

            let outcome = pipeline::resolve_part(
                &store,
                &client,
                reviewer.as_ref(),
                &cfg.resolution,
                &part,
                1,
            )
            .await;
            pool.close().await;

            match outcome {
                Ok(resolution) => {
                    print_record(&resolution.record);
                    eprintln!("remote calls: {}", resolution.remote_calls);
                    if resolution.record.is_failed() {
                        std::process::exit(1);
                    }
                }
                Err(ResolveError::Quota { retry_after }) => {
                    match retry_after {
                        Some(secs) => {
                            eprintln!("Error: daily call quota exceeded (retry after {}s)", secs)
                        }
                        None => eprintln!("Error: daily call quota exceeded"),
                    }
                    std::process::exit(2);
                }
            }
        }
        Commands::Batch {
            file,
            column,
            start_row,
            limit,
            no_prompt,
            progress,
        } => {
            let mode = match progress.as_deref() {
                None => ProgressMode::default_for_tty(),
                Some("off") => ProgressMode::Off,
                Some("human") => ProgressMode::Human,
                Some("json") => ProgressMode::Json,
                Some(other) => anyhow::bail!(
                    "invalid --progress mode '{}': expected off, human, or json",
                    other
                ),
            };
            let reporter = mode.reporter();
            reporter.report(BatchProgressEvent::Loading {
                source: file.display().to_string(),
            });

            let cells = sheet::load_cells(&file, &column)?;

            let pool = db::connect(&cfg).await?;
            let store = CacheStore::new(pool.clone());
            let client = DigiKeyClient::new(&cfg.catalog)?;
            let reviewer: Box<dyn Reviewer> = if no_prompt {
                Box::new(AutoSkip)
            } else {
                Box::new(PromptReviewer)
            };

            let report = batch::run_batch(
                &store,
                &client,
                reviewer.as_ref(),
                &cfg.resolution,
                cfg.catalog.daily_limit,
                &cells,
                start_row,
                limit,
                reporter.as_ref(),
            )
            .await?;
            pool.close().await;

            for rr in &report.records {
                let status = match &rr.record.error {
                    Some(err) => err.as_str(),
                    None => "ok",
                };
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    rr.row,
                    rr.record.part_number.escape_debug(),
                    rr.record.manufacturer,
                    rr.record.mounting_type,
                    status
                );
            }
            println!();
            batch::print_report(&file.display().to_string(), &report, cfg.catalog.daily_limit);
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Get { part } => {
                let pool = db::connect(&cfg).await?;
                let store = CacheStore::new(pool.clone());
                let record = store.get(&part).await?;
                pool.close().await;
                match record {
                    Some(record) => print_record(&record),
                    None => {
                        eprintln!("not cached: {}", part.escape_debug());
                        std::process::exit(1);
                    }
                }
            }
        },
    }

    Ok(())
}

/// Print one record to stdout, `key: value` per line.
fn print_record(record: &ResolutionRecord) {
    println!("--- Part ---");
    println!("part:         {}", record.part_number.escape_debug());
    println!("manufacturer: {}", record.manufacturer);
    println!("mounting:     {}", record.mounting_type);
    if !record.description.is_empty() {
        println!("description:  {}", record.description);
    }
    println!("quantity:     {}", record.quantity_available);
    println!("price:        {:.4}", record.unit_price);
    if let Some(ref url) = record.product_url {
        println!("product:      {}", url);
    }
    if let Some(ref url) = record.datasheet_url {
        println!("datasheet:    {}", url);
    }
    println!("source:       {}", record.source.as_str());
    if let Some(ref err) = record.error {
        println!("error:        {}", err);
    }
}
