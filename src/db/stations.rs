//! Station registry: external station code -> internal identity.

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::debug;

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub station_id: i64,
    pub station_code: String,
}

/// Returns the identity for `code`, creating the station on first sight.
///
/// Insert-if-absent then lookup; the unique constraint on `station_code`
/// keeps concurrent callers on the same row.
pub fn ensure_station(conn: &Connection, code: &str) -> Result<i64, StorageError> {
    let created = conn.execute(
        "INSERT INTO stations (station_code) VALUES (?1)
         ON CONFLICT (station_code) DO NOTHING",
        params![code],
    )?;
    if created == 1 {
        debug!("Registered station {}", code);
    }

    station_id(conn, code)?.ok_or_else(|| StorageError::MissingStation(code.to_string()))
}

fn station_id(conn: &Connection, code: &str) -> Result<Option<i64>, StorageError> {
    let mut stmt = conn.prepare_cached("SELECT station_id FROM stations WHERE station_code = ?1")?;
    let mut rows = stmt.query(params![code])?;

    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

pub fn list_stations(conn: &Connection) -> Result<Vec<Station>, StorageError> {
    let mut stmt =
        conn.prepare("SELECT station_id, station_code FROM stations ORDER BY station_id")?;
    let stations = stmt
        .query_map([], |row| {
            Ok(Station {
                station_id: row.get(0)?,
                station_code: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(stations)
}

// -- Tests -------------------------------------------------------------------
