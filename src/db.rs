//! SQLite store holding stations, daily observations and yearly statistics.

pub mod observations;
pub mod query;
pub mod stations;
pub mod stats;

use std::{path::Path, time::Duration};

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::StorageError;

pub use observations::{insert_observation, DedupPolicy, InsertOutcome};
pub use stations::{ensure_station, list_stations, Station};
pub use stats::{aggregate_yearly_stats, AggregationReport, StatsPolicy};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS stations (
        station_id INTEGER PRIMARY KEY AUTOINCREMENT,
        station_code TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS weather_data (
        station_id INTEGER NOT NULL REFERENCES stations (station_id),
        weather_date TEXT NOT NULL,
        max_temp REAL,
        min_temp REAL,
        precipitation REAL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS weather_data_tuple ON weather_data (
        station_id,
        weather_date,
        COALESCE(max_temp, 'NA'),
        COALESCE(min_temp, 'NA'),
        COALESCE(precipitation, 'NA')
    );

    CREATE INDEX IF NOT EXISTS weather_data_station_date
        ON weather_data (station_id, weather_date);

    CREATE TABLE IF NOT EXISTS weather_stats (
        station_id INTEGER NOT NULL REFERENCES stations (station_id),
        year INTEGER NOT NULL,
        avg_max_temp REAL NOT NULL,
        avg_min_temp REAL NOT NULL,
        total_precipitation REAL NOT NULL,
        UNIQUE (station_id, year)
    );
"#;

/// An open connection with the schema in place.
///
/// Every worker owns its own `Store`; components borrow the connection.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (creating if needed) the database file. `timeout` bounds how long a
    /// statement waits on a locked database before failing with `StorageError::Busy`.
    pub fn open(path: &Path, timeout: Duration) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.execute_batch("PRAGMA synchronous = NORMAL")?;

        debug!("Opened database {}", path.display());
        Self::prepare(conn)
    }

    /// Opens an existing database for reading only. Nothing is created and
    /// no schema is applied.
    pub fn open_read_only(path: &Path, timeout: Duration) -> Result<Self, StorageError> {
        if !path.is_file() {
            return Err(StorageError::MissingDatabase(path.to_path_buf()));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        conn.busy_timeout(timeout)?;

        debug!("Opened database {} read-only", path.display());
        Ok(Store { conn })
    }

    /// Private in-memory database, one per call.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> Result<Self, StorageError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Store { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

/// Number of rows in a table, for reporting.
pub fn count_rows(conn: &Connection, table: Table) -> Result<u64, StorageError> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.name());
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Observations,
    YearlyStats,
}

impl Table {
    fn name(&self) -> &'static str {
        match self {
            Table::Observations => "weather_data",
            Table::YearlyStats => "weather_stats",
        }
    }
}

// -- Tests -------------------------------------------------------------------
