//! # Part Scout
//!
//! A batch resolver for electronic part numbers against the DigiKey catalog.
//!
//! Part Scout takes messy part-number lists (spreadsheet columns, plain text
//! files) and resolves each identifier to a catalog record through an
//! ordered fallback chain: local cache, exact lookup, cleanup retry, fuzzy
//! candidate search with human disambiguation, and a manual escape hatch.
//! Every outcome, including failures, lands in a SQLite cache so repeat runs
//! cost no API budget.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────┐
//! │  Sheet   │──▶│  Pipeline   │──▶│  SQLite   │
//! │ xlsx/txt │   │ 5 fallback │   │  cache +  │
//! └──────────┘   │   stages   │   │  budget   │
//!                └─────┬──────┘   └──────────┘
//!                      │
//!              ┌───────┴────────┐
//!              ▼                ▼
//!        ┌──────────┐    ┌──────────┐
//!        │ Catalog  │    │ Reviewer │
//!        │ (DigiKey)│    │ (stderr) │
//!        └──────────┘    └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pns init                      # create the cache database
//! pns resolve LM358N            # resolve one part
//! pns batch parts.xlsx          # resolve a whole column
//! pns stats                     # cache and budget overview
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and failure sentinels |
//! | [`catalog`] | Remote catalog client (DigiKey v4 API) |
//! | [`pipeline`] | The fallback resolution chain |
//! | [`similarity`] | Normalized edit-distance scoring |
//! | [`review`] | Human disambiguation prompts |
//! | [`batch`] | Batch runner over spreadsheet columns |
//! | [`sheet`] | Spreadsheet and text-list input |
//! | [`store`] | Cache and call-budget storage |
//! | [`progress`] | Batch progress reporting |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod batch;
pub mod catalog;
pub mod config;
pub mod db;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod review;
pub mod sheet;
pub mod similarity;
pub mod stats;
pub mod store;
