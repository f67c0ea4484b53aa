//! # record-query
//!
//! Ask free-text questions about imported tabular maintenance records and
//! get a conversational answer back.
//!
//! Spreadsheet exports are imported as collections of flat records with
//! whatever headers the file had. A question is classified, turned into
//! filters, executed against the store, and answered in plain English. Open
//! analytical questions can be handed to an external text model together
//! with the whole dataset.
//!
//! ## Architecture
//!
//! ```text
//!  question
//!     │
//!     ▼
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌──────────┐
//! │  intent  │──▶│ extract  │──▶│ executor │──▶│ aggregate │──▶│  format  │
//! └──────────┘   └────┬─────┘   └────┬─────┘   └───────────┘   └──────────┘
//!                     │              │
//!               ┌─────┴─────┐   ┌────┴──────┐        low confidence ┌─────┐
//!               │  mapping  │   │   store   │ ─────────────────────▶│ llm │
//!               └───────────┘   │ SQLite/mem│                       └─────┘
//!                               └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rq init
//! rq ingest ./exports/work-orders.csv
//! rq ask "Give me the identifier for main street"
//! rq serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | `QueryEngine::submit`, dataset context, model fallback |
//! | [`mapping`] | Semantic role → header resolution |
//! | [`intent`] | Ordered rule-table intent classification |
//! | [`extract`] | Predicates, sort and limit from question text |
//! | [`executor`] | Predicate execution, sort, limit |
//! | [`aggregate`] | Count, sum, average, max, min |
//! | [`format`] | Natural-language answers |
//! | [`llm`] | Text model providers and prompt building |
//! | [`store`] | `RecordStore` trait and in-memory store |
//! | [`sqlite_store`] | SQLite `RecordStore` |
//! | [`ingest`] | CSV import |
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Query error taxonomy |
//! | [`server`] | JSON HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod aggregate;
pub mod ask;
pub mod config;
pub mod datasets;
pub mod db;
pub mod engine;
pub mod error;
pub mod executor;
pub mod extract;
pub mod format;
pub mod ingest;
pub mod intent;
pub mod llm;
pub mod mapping;
pub mod migrate;
pub mod models;
pub mod server;
pub mod sqlite_store;
pub mod store;
