pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod loader;
pub mod reading;

pub use error::{ParseError, PipelineError, Result, StorageError};
