//! # record-query CLI (`rq`)
//!
//! ## Usage
//!
//! ```bash
//! rq --config ./config/rq.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rq init` | Create the SQLite database and run schema migrations |
//! | `rq ingest <file.csv>` | Import a spreadsheet export as a new dataset |
//! | `rq datasets` | List imported datasets, newest first |
//! | `rq ask "<question>"` | Answer a question about the active dataset |
//! | `rq serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! rq init
//! rq ingest ./exports/work-orders.csv
//! rq ask "Give me the identifier for main street"
//! rq ask "How many issues are there?" --json
//! rq serve
//! ```
//!
//! Diagnostics go to stderr through `tracing`; set `RUST_LOG` (e.g.
//! `RUST_LOG=record_query=debug`) or pass `--verbose`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use record_query::{ask, config, datasets, ingest, migrate, server};

/// Ask free-text questions about imported maintenance records.
#[derive(Parser)]
#[command(
    name = "rq",
    about = "record-query: ask free-text questions about imported maintenance records",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rq.toml")]
    config: PathBuf,

    /// Log debug diagnostics to stderr (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Import a CSV file as a new dataset.
    ///
    /// The first row is the header row. A file that was already imported
    /// byte for byte is skipped unless `--force` is given.
    Ingest {
        /// Path to the CSV file.
        path: PathBuf,

        /// Name to record instead of the file name.
        #[arg(long)]
        name: Option<String>,

        /// Import again even if the same file was imported before.
        #[arg(long)]
        force: bool,
    },

    /// List imported datasets.
    Datasets,

    /// Answer a question.
    ///
    /// Uses the newest dataset unless `--dataset` names another one.
    Ask {
        /// The question, e.g. "what happened on 2025-06-24?".
        question: String,

        /// Dataset (collection) id to ask about.
        #[arg(long)]
        dataset: Option<String>,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { path, name, force } => {
            ingest::run_ingest(&cfg, &path, name.as_deref(), force).await?;
        }
        Commands::Datasets => {
            datasets::run_datasets(&cfg).await?;
        }
        Commands::Ask {
            question,
            dataset,
            json,
        } => {
            let answered = ask::run_ask(&cfg, &question, dataset.as_deref(), json).await?;
            if !answered {
                std::process::exit(1);
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
