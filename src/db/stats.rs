//! Yearly per-station statistics derived from the observation table.

use std::time::Instant;

use chrono::{DateTime, Local};
use clap::ValueEnum;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use tracing::{error, info};

use crate::error::StorageError;

use super::{count_rows, Table};

/// What happens when a (station, year) statistic already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StatsPolicy {
    /// Compute once; existing rows are never touched.
    #[default]
    Freeze,
    /// Recompute existing rows from the current observations.
    Refresh,
}

#[derive(Debug, Clone)]
pub struct AggregationReport {
    pub inserted: u64,
    pub refreshed: u64,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl AggregationReport {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

// Rows with any unknown measurement are dropped before grouping.
const SELECT_YEARLY: &str = "
    SELECT
        station_id,
        CAST(strftime('%Y', weather_date) AS INTEGER) AS year,
        AVG(max_temp),
        AVG(min_temp),
        SUM(precipitation) / 10.0
    FROM weather_data
    WHERE max_temp IS NOT NULL
      AND min_temp IS NOT NULL
      AND precipitation IS NOT NULL
    GROUP BY station_id, year";

/// Computes mean max/min temperature (°C) and total precipitation (cm) for
/// every (station, year) and persists them in one transaction.
pub fn aggregate_yearly_stats(
    conn: &mut Connection,
    policy: StatsPolicy,
) -> Result<AggregationReport, StorageError> {
    let started_at = Local::now();
    let timer = Instant::now();
    info!("Aggregation started at {} ({:?} policy)", started_at, policy);

    let (inserted, refreshed) = match write_stats(conn, policy) {
        Ok(counts) => counts,
        Err(e) => {
            error!("Aggregation failed, rolled back: {}", e);
            return Err(e);
        }
    };

    let finished_at = Local::now();
    info!(
        "Aggregation finished at {}: {} new, {} refreshed yearly statistics in {:?}",
        finished_at,
        inserted,
        refreshed,
        timer.elapsed()
    );

    Ok(AggregationReport {
        inserted,
        refreshed,
        started_at,
        finished_at,
    })
}

fn write_stats(conn: &mut Connection, policy: StatsPolicy) -> Result<(u64, u64), StorageError> {
    // Write lock up front so the counts and the insert share one snapshot.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let before = count_rows(&tx, Table::YearlyStats)?;

    let conflict = match policy {
        StatsPolicy::Freeze => "DO NOTHING",
        StatsPolicy::Refresh => {
            "DO UPDATE SET
                avg_max_temp = excluded.avg_max_temp,
                avg_min_temp = excluded.avg_min_temp,
                total_precipitation = excluded.total_precipitation"
        }
    };
    let sql = format!(
        "INSERT INTO weather_stats
            (station_id, year, avg_max_temp, avg_min_temp, total_precipitation)
         {SELECT_YEARLY}
         ON CONFLICT (station_id, year) {conflict}"
    );
    let changed = tx.execute(&sql, [])? as u64;

    let after = count_rows(&tx, Table::YearlyStats)?;
    tx.commit()?;

    let inserted = after - before;
    Ok((inserted, changed - inserted))
}

// -- Tests -------------------------------------------------------------------
