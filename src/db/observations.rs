//! Conflict-safe observation inserts.

use clap::ValueEnum;
use rusqlite::{params, Connection};
use serde::Deserialize;

use crate::{error::StorageError, reading::DailyObservation};

/// Which rows count as the same observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// Identical (station, date, max, min, precipitation) tuples are skipped;
    /// a revised value for the same date becomes a second row.
    #[default]
    FullTuple,
    /// A revised value for the same (station, date) replaces the stored rows.
    StationDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Inserted, and older rows for the same (station, date) were removed.
    Replaced,
    Duplicate,
}

impl InsertOutcome {
    /// 1 when a row was physically written.
    pub fn rows_inserted(&self) -> u64 {
        match self {
            InsertOutcome::Inserted | InsertOutcome::Replaced => 1,
            InsertOutcome::Duplicate => 0,
        }
    }
}

const INSERT_SQL: &str = "
    INSERT INTO weather_data (station_id, weather_date, max_temp, min_temp, precipitation)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT DO NOTHING";

pub fn insert_observation(
    conn: &Connection,
    station_id: i64,
    obs: &DailyObservation,
    policy: DedupPolicy,
) -> Result<InsertOutcome, StorageError> {
    match policy {
        DedupPolicy::FullTuple => insert_tuple(conn, station_id, obs),
        DedupPolicy::StationDate => replace_station_date(conn, station_id, obs),
    }
}

fn insert_tuple(
    conn: &Connection,
    station_id: i64,
    obs: &DailyObservation,
) -> Result<InsertOutcome, StorageError> {
    let mut stmt = conn.prepare_cached(INSERT_SQL)?;
    let changed = stmt.execute(params![
        station_id,
        obs.date,
        obs.max_temp,
        obs.min_temp,
        obs.precipitation
    ])?;

    Ok(match changed {
        0 => InsertOutcome::Duplicate,
        _ => InsertOutcome::Inserted,
    })
}

// Insert and delete commit together so a reader never sees the date empty.
// An identical stored tuple is left alone; only other revisions are removed.
fn replace_station_date(
    conn: &Connection,
    station_id: i64,
    obs: &DailyObservation,
) -> Result<InsertOutcome, StorageError> {
    let tx = conn.unchecked_transaction()?;

    let outcome = insert_tuple(&tx, station_id, obs)?;
    let removed = tx.execute(
        "DELETE FROM weather_data
         WHERE station_id = ?1 AND weather_date = ?2
           AND NOT (max_temp IS ?3 AND min_temp IS ?4 AND precipitation IS ?5)",
        params![
            station_id,
            obs.date,
            obs.max_temp,
            obs.min_temp,
            obs.precipitation
        ],
    )?;
    tx.commit()?;

    Ok(match (outcome, removed) {
        (InsertOutcome::Duplicate, _) => InsertOutcome::Duplicate,
        (_, 0) => InsertOutcome::Inserted,
        _ => InsertOutcome::Replaced,
    })
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::{count_rows, ensure_station, Store, Table};
    use chrono::NaiveDate;

    fn observation(day: u32, max: Option<f64>, min: Option<f64>, precip: Option<f64>) -> DailyObservation {
        DailyObservation {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            max_temp: max,
            min_temp: min,
            precipitation: precip,
        }
    }

    #[test]
    fn should_skip_identical_tuple() {
        let store = Store::open_in_memory().unwrap();
        let id = ensure_station(store.conn(), "USC001").unwrap();
        let obs = observation(1, Some(28.9), Some(-5.0), Some(0.0));

        let first = insert_observation(store.conn(), id, &obs, DedupPolicy::FullTuple).unwrap();
        let second = insert_observation(store.conn(), id, &obs, DedupPolicy::FullTuple).unwrap();

        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::Duplicate);
        assert_eq!(count_rows(store.conn(), Table::Observations).unwrap(), 1);
    }

    #[test]
    fn should_skip_identical_tuple_with_unknowns() {
        let store = Store::open_in_memory().unwrap();
        let id = ensure_station(store.conn(), "USC001").unwrap();
        let obs = observation(2, Some(30.0), None, Some(2.5));

        insert_observation(store.conn(), id, &obs, DedupPolicy::FullTuple).unwrap();
        let again = insert_observation(store.conn(), id, &obs, DedupPolicy::FullTuple).unwrap();

        assert_eq!(again, InsertOutcome::Duplicate);
        assert_eq!(count_rows(store.conn(), Table::Observations).unwrap(), 1);
    }

    #[test]
    fn should_keep_revised_value_as_second_row() {
        let store = Store::open_in_memory().unwrap();
        let id = ensure_station(store.conn(), "USC001").unwrap();

        let original = observation(1, Some(28.9), Some(-5.0), Some(0.0));
        let revised = observation(1, Some(29.1), Some(-5.0), Some(0.0));
        insert_observation(store.conn(), id, &original, DedupPolicy::FullTuple).unwrap();
        let outcome =
            insert_observation(store.conn(), id, &revised, DedupPolicy::FullTuple).unwrap();

        assert_eq!(outcome, InsertOutcome::Inserted);
        assert_eq!(count_rows(store.conn(), Table::Observations).unwrap(), 2);
    }

    #[test]
    fn should_replace_revised_value_by_station_date() {
        let store = Store::open_in_memory().unwrap();
        let id = ensure_station(store.conn(), "USC001").unwrap();

        let original = observation(1, Some(28.9), Some(-5.0), Some(0.0));
        let revised = observation(1, Some(29.1), Some(-5.0), Some(0.0));
        let policy = DedupPolicy::StationDate;

        assert_eq!(
            insert_observation(store.conn(), id, &original, policy).unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            insert_observation(store.conn(), id, &revised, policy).unwrap(),
            InsertOutcome::Replaced
        );
        assert_eq!(
            insert_observation(store.conn(), id, &revised, policy).unwrap(),
            InsertOutcome::Duplicate
        );

        let max: f64 = store
            .conn()
            .query_row("SELECT max_temp FROM weather_data", [], |row| row.get(0))
            .unwrap();
        assert_eq!(max, 29.1);
        assert_eq!(count_rows(store.conn(), Table::Observations).unwrap(), 1);
    }

    #[test]
    fn should_drop_stale_revisions_when_tuple_already_stored() {
        let store = Store::open_in_memory().unwrap();
        let id = ensure_station(store.conn(), "USC001").unwrap();

        let original = observation(1, Some(28.9), Some(-5.0), None);
        let revised = observation(1, Some(29.1), Some(-5.0), None);
        insert_observation(store.conn(), id, &original, DedupPolicy::FullTuple).unwrap();
        insert_observation(store.conn(), id, &revised, DedupPolicy::FullTuple).unwrap();

        let outcome =
            insert_observation(store.conn(), id, &revised, DedupPolicy::StationDate).unwrap();
        let again =
            insert_observation(store.conn(), id, &revised, DedupPolicy::StationDate).unwrap();

        assert_eq!(outcome, InsertOutcome::Duplicate);
        assert_eq!(again, InsertOutcome::Duplicate);
        let max: f64 = store
            .conn()
            .query_row("SELECT max_temp FROM weather_data", [], |row| row.get(0))
            .unwrap();
        assert_eq!(max, 29.1);
        assert_eq!(count_rows(store.conn(), Table::Observations).unwrap(), 1);
    }

    #[test]
    fn should_reject_unknown_station() {
        let store = Store::open_in_memory().unwrap();
        let obs = observation(1, Some(1.0), Some(1.0), Some(1.0));

        let result = insert_observation(store.conn(), 42, &obs, DedupPolicy::FullTuple);
        assert!(matches!(result, Err(StorageError::Sqlite(_))));
    }
}
