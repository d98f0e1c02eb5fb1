//! Layered settings: defaults, then `wxdb.toml`, then `WXDB_*` environment
//! variables. Command line flags are applied on top by the CLI.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::{
    db::{DedupPolicy, StatsPolicy},
    error::PipelineError,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: PathBuf,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub station_map: Option<PathBuf>,
    pub workers: usize,
    pub timeout_secs: u64,
    pub dedup: DedupPolicy,
    pub stats: StatsPolicy,
    pub progress: bool,
    pub log_level: String,
}

impl Settings {
    pub fn load(config_file: Option<&Path>) -> Result<Self, PipelineError> {
        let builder = Config::builder()
            .set_default("database", default_database().to_string_lossy().to_string())?
            .set_default("workers", num_cpus::get() as i64)?
            .set_default("timeout_secs", 30_i64)?
            .set_default("dedup", "full-tuple")?
            .set_default("stats", "freeze")?
            .set_default("progress", true)?
            .set_default("log_level", "info")?;

        let builder = match config_file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("wxdb").required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix("WXDB"))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_database() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wxdb.sqlite")
}

// -- Tests -------------------------------------------------------------------
