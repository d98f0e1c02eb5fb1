//! Command line interface.

pub mod command;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{command, Args, Parser, Subcommand};

use crate::db::{DedupPolicy, StatsPolicy};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file [default: ./wxdb.toml if present]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Seconds a statement may wait on a locked database
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load station files into the database
    Ingest(IngestArgs),
    /// Compute yearly statistics from loaded observations
    Aggregate(AggregateArgs),
    /// Ingest, then aggregate
    Run {
        #[command(flatten)]
        ingest: IngestArgs,
        #[command(flatten)]
        aggregate: AggregateArgs,
    },
    /// Read observations or statistics as JSON
    Query {
        #[command(subcommand)]
        target: QueryTarget,
    },
    /// List registered stations
    Stations {},
}

#[derive(Args, Debug, Default)]
pub struct IngestArgs {
    /// Directory of `<station_code>.<ext>` files
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Explicit `file_name<TAB>station_code` table
    #[arg(long)]
    pub station_map: Option<PathBuf>,

    /// Files processed in parallel
    #[arg(short, long)]
    pub workers: Option<usize>,

    #[arg(long, value_enum)]
    pub dedup: Option<DedupPolicy>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Debug, Default)]
pub struct AggregateArgs {
    #[arg(long, value_enum)]
    pub stats: Option<StatsPolicy>,
}

#[derive(Subcommand, Debug)]
pub enum QueryTarget {
    /// Daily observations, paginated
    Weather {
        #[arg(long)]
        station_id: Option<i64>,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        per_page: u32,
    },
    /// Yearly statistics
    Stats {
        #[arg(long)]
        station_id: Option<i64>,
        #[arg(long)]
        year: Option<i32>,
    },
}

/// Installs the stderr subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wxdb={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

// -- Tests -------------------------------------------------------------------
