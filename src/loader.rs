//! Streams the lines of one station file into the observation table.

use std::{collections::HashMap, io};

use chrono::NaiveDate;
use rusqlite::Connection;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    db::{insert_observation, DedupPolicy, InsertOutcome},
    reading::DailyObservation,
};

/// Tally of one file's lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub lines: u64,
    pub inserted: u64,
    pub replaced: u64,
    pub duplicates: u64,
    /// Lines overridden by a later line for the same date in the same file.
    pub superseded: u64,
    pub parse_errors: u64,
    pub storage_errors: u64,
    pub cancelled: bool,
}

impl LoadReport {
    /// Rows physically written, replacements included.
    pub fn rows_inserted(&self) -> u64 {
        self.inserted + self.replaced
    }

    pub fn merge(&mut self, other: &LoadReport) {
        self.lines += other.lines;
        self.inserted += other.inserted;
        self.replaced += other.replaced;
        self.duplicates += other.duplicates;
        self.superseded += other.superseded;
        self.parse_errors += other.parse_errors;
        self.storage_errors += other.storage_errors;
        self.cancelled |= other.cancelled;
    }

    fn record(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.inserted += 1,
            InsertOutcome::Replaced => self.replaced += 1,
            InsertOutcome::Duplicate => self.duplicates += 1,
        }
    }
}

/// Loads every line, skipping blank ones. Parse and storage failures are
/// logged and counted without stopping the file; a read error stops it.
///
/// Under `DedupPolicy::StationDate` the file is parsed first and only the
/// last line for each date is written.
pub fn load_lines<I>(
    conn: &Connection,
    station_id: i64,
    source: &str,
    lines: I,
    policy: DedupPolicy,
    cancel: &CancellationToken,
) -> Result<LoadReport, (LoadReport, io::Error)>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut report = LoadReport::default();
    let mut pending: Vec<(usize, DailyObservation)> = Vec::new();

    for (idx, line) in lines.into_iter().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => return Err((report, e)),
        };
        if line.trim().is_empty() {
            continue;
        }
        report.lines += 1;

        let obs = match DailyObservation::from_line(&line) {
            Ok(obs) => obs,
            Err(e) => {
                warn!("{}:{}: skipped line: {}", source, idx + 1, e);
                report.parse_errors += 1;
                continue;
            }
        };

        match policy {
            DedupPolicy::FullTuple => {
                store(conn, station_id, source, idx + 1, &obs, policy, &mut report)
            }
            DedupPolicy::StationDate => pending.push((idx + 1, obs)),
        }
    }

    let latest: HashMap<NaiveDate, usize> = pending
        .iter()
        .enumerate()
        .map(|(pos, (_, obs))| (obs.date, pos))
        .collect();

    for (pos, (line_no, obs)) in pending.iter().enumerate() {
        if latest.get(&obs.date) != Some(&pos) {
            debug!("{}:{}: superseded by a later line", source, line_no);
            report.superseded += 1;
            continue;
        }
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        store(conn, station_id, source, *line_no, obs, policy, &mut report);
    }

    Ok(report)
}

fn store(
    conn: &Connection,
    station_id: i64,
    source: &str,
    line_no: usize,
    obs: &DailyObservation,
    policy: DedupPolicy,
    report: &mut LoadReport,
) {
    match insert_observation(conn, station_id, obs, policy) {
        Ok(outcome) => report.record(outcome),
        Err(e) => {
            warn!("{}:{}: insert failed: {}", source, line_no, e);
            report.storage_errors += 1;
        }
    }
}

// -- Tests -------------------------------------------------------------------
