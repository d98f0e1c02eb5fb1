//! Error taxonomy for ingestion and aggregation.

use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// A malformed token in an input line. Scoped to the line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected 4 tab-separated fields, found {0}")]
    FieldCount(usize),

    #[error("malformed date `{0}`")]
    Date(String),

    #[error("malformed measurement `{0}`")]
    Measurement(String),

    #[error("malformed station mapping line `{0}`")]
    Mapping(String),
}

/// Failures of the underlying store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database busy or locked past the storage timeout: {0}")]
    Busy(rusqlite::Error),

    #[error("database error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("station `{0}` missing after insert")]
    MissingStation(String),

    #[error("database {} does not exist", .0.display())]
    MissingDatabase(PathBuf),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                StorageError::Busy(err)
            }
            _ => StorageError::Sqlite(err),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Worker task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

// -- Tests -------------------------------------------------------------------
