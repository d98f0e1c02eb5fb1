pub mod aggregate;
pub mod ingest;
pub mod query;
pub mod stations;

use anyhow::Result;

pub use aggregate::aggregate;
pub use ingest::ingest;
pub use query::query;
pub use stations::stations;

use crate::{
    cli::{AggregateArgs, Cli, IngestArgs},
    config::Settings,
};

/// Settings file and environment, overridden by global flags.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;

    if let Some(database) = &cli.database {
        settings.database.clone_from(database);
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        settings.timeout_secs = timeout_secs;
    }
    if let Some(log_level) = &cli.log_level {
        settings.log_level.clone_from(log_level);
    }

    Ok(settings)
}

fn apply_ingest_args(settings: &mut Settings, args: &IngestArgs) {
    if let Some(data_dir) = &args.data_dir {
        settings.data_dir = Some(data_dir.clone());
    }
    if let Some(station_map) = &args.station_map {
        settings.station_map = Some(station_map.clone());
    }
    if let Some(workers) = args.workers {
        settings.workers = workers;
    }
    if let Some(dedup) = args.dedup {
        settings.dedup = dedup;
    }
    if args.no_progress {
        settings.progress = false;
    }
}

fn apply_aggregate_args(settings: &mut Settings, args: &AggregateArgs) {
    if let Some(stats) = args.stats {
        settings.stats = stats;
    }
}
