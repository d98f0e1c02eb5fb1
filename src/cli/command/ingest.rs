use anyhow::{anyhow, Result};
use tokio_util::sync::CancellationToken;

use crate::{
    cli::IngestArgs,
    config::Settings,
    ingest::{ingest_directory, IngestOptions, IngestReport},
    reading::StationMapping,
};

use super::apply_ingest_args;

pub async fn ingest(
    mut settings: Settings,
    args: &IngestArgs,
    cancel: CancellationToken,
) -> Result<String> {
    apply_ingest_args(&mut settings, args);
    let report = run_ingest(&settings, cancel).await?;

    Ok(summarise(&report))
}

pub(super) async fn run_ingest(
    settings: &Settings,
    cancel: CancellationToken,
) -> Result<IngestReport> {
    let data_dir = settings
        .data_dir
        .as_deref()
        .ok_or_else(|| anyhow!("No data directory: pass --data-dir or set data_dir"))?;

    let mapping = match &settings.station_map {
        Some(path) => StationMapping::from_file(path)?,
        None => StationMapping::FileStem,
    };

    let options = IngestOptions {
        database: settings.database.clone(),
        timeout: settings.timeout(),
        workers: settings.workers,
        dedup: settings.dedup,
        mapping,
        show_progress: settings.progress,
    };

    Ok(ingest_directory(data_dir, &options, cancel).await?)
}

pub(super) fn summarise(report: &IngestReport) -> String {
    let totals = &report.totals;
    let mut summary = format!(
        "{} lines processed in {} files: {} inserted, {} duplicates skipped, {} bad lines",
        totals.lines,
        report.files.len() + report.failures.len(),
        report.rows_inserted(),
        totals.duplicates,
        totals.parse_errors + totals.storage_errors,
    );
    if totals.superseded > 0 {
        summary.push_str(&format!(", {} superseded", totals.superseded));
    }
    if !report.failures.is_empty() {
        summary.push_str(&format!(", {} files failed", report.failures.len()));
    }
    if !report.unmapped.is_empty() {
        summary.push_str(&format!(", {} files unmapped", report.unmapped.len()));
    }
    if report.cancelled {
        summary.push_str(" (cancelled)");
    }

    summary
}
