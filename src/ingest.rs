//! Drives a folder of station files through the registry and the loader.

use std::{
    fs::File,
    io::{self, BufRead},
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, Local};
use futures::{stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    db::{ensure_station, DedupPolicy, Store},
    error::PipelineError,
    loader::{load_lines, LoadReport},
    reading::StationMapping,
};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub database: PathBuf,
    pub timeout: Duration,
    pub workers: usize,
    pub dedup: DedupPolicy,
    pub mapping: StationMapping,
    pub show_progress: bool,
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub file: PathBuf,
    pub station_code: String,
    pub station_id: i64,
    pub load: LoadReport,
}

/// A file that could not be (fully) processed. Rows committed before the
/// failure are counted in `partial`.
#[derive(Debug)]
pub struct FileFailure {
    pub file: PathBuf,
    pub error: PipelineError,
    pub partial: LoadReport,
}

#[derive(Debug)]
pub struct IngestReport {
    pub files: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
    pub unmapped: Vec<PathBuf>,
    pub skipped_after_cancel: Vec<PathBuf>,
    pub totals: LoadReport,
    pub cancelled: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl IngestReport {
    /// Newly inserted observation rows across all files.
    pub fn rows_inserted(&self) -> u64 {
        self.totals.rows_inserted()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

enum FileOutcome {
    Loaded(FileReport),
    Failed(FileFailure),
    Unmapped(PathBuf),
    NotStarted(PathBuf),
}

/// Regular, non-hidden files in `dir`, sorted by name.
pub fn list_input_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();

    for entry in dir.read_dir().map_err(|e| PipelineError::io(dir, e))? {
        let path = entry.map_err(|e| PipelineError::io(dir, e))?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |n| n.starts_with('.'));

        if path.is_file() && !hidden {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

pub async fn ingest_directory(
    dir: &Path,
    options: &IngestOptions,
    cancel: CancellationToken,
) -> Result<IngestReport, PipelineError> {
    let files = list_input_files(dir)?;
    info!("Found {} input files in {}", files.len(), dir.display());

    ingest_files(files, options, cancel).await
}

/// Processes `files` with at most `options.workers` in flight, one
/// connection per file. Failures are collected, never propagated.
pub async fn ingest_files(
    files: Vec<PathBuf>,
    options: &IngestOptions,
    cancel: CancellationToken,
) -> Result<IngestReport, PipelineError> {
    let started_at = Local::now();
    info!("Data ingestion started at {}", started_at);

    // Create the schema once before workers race to open the file.
    Store::open(&options.database, options.timeout)?;

    let progress_bar = make_progress_bar(files.len(), options.show_progress);
    let workers = options.workers.max(1);

    let outcomes: Vec<FileOutcome> = stream::iter(files)
        .map(|file| {
            let cancel = cancel.clone();
            let pb = progress_bar.clone();
            let options = options.clone();

            async move {
                if cancel.is_cancelled() {
                    return FileOutcome::NotStarted(file);
                }
                let Some(code) = options.mapping.station_code(&file) else {
                    warn!("No station code for {}, skipping", file.display());
                    pb.inc(1);
                    return FileOutcome::Unmapped(file);
                };

                let task_file = file.clone();
                let result = tokio::task::spawn_blocking(move || {
                    let store = Store::open(&options.database, options.timeout)
                        .map_err(|e| failure(&task_file, e.into()))?;
                    ingest_file(store.conn(), &task_file, &code, options.dedup, &cancel)
                })
                .await;
                pb.inc(1);

                match result {
                    Ok(Ok(report)) => FileOutcome::Loaded(report),
                    Ok(Err(failure)) => FileOutcome::Failed(failure),
                    Err(e) => FileOutcome::Failed(failure(&file, e.into())),
                }
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    progress_bar.finish_with_message("Ingestion complete");

    let mut report = IngestReport {
        files: Vec::new(),
        failures: Vec::new(),
        unmapped: Vec::new(),
        skipped_after_cancel: Vec::new(),
        totals: LoadReport::default(),
        cancelled: cancel.is_cancelled(),
        started_at,
        finished_at: started_at,
    };

    for outcome in outcomes {
        match outcome {
            FileOutcome::Loaded(file) => {
                report.totals.merge(&file.load);
                report.files.push(file);
            }
            FileOutcome::Failed(failure) => {
                warn!("File {} failed: {}", failure.file.display(), failure.error);
                report.totals.merge(&failure.partial);
                report.failures.push(failure);
            }
            FileOutcome::Unmapped(file) => report.unmapped.push(file),
            FileOutcome::NotStarted(file) => report.skipped_after_cancel.push(file),
        }
    }
    report.files.sort_by(|a, b| a.file.cmp(&b.file));
    report.finished_at = Local::now();

    log_summary(&report);

    Ok(report)
}

/// Registers the file's station and loads its lines on `conn`.
pub fn ingest_file(
    conn: &Connection,
    path: &Path,
    station_code: &str,
    dedup: DedupPolicy,
    cancel: &CancellationToken,
) -> Result<FileReport, FileFailure> {
    debug!("Processing file: {}", path.display());

    let station_id = ensure_station(conn, station_code).map_err(|e| failure(path, e.into()))?;
    let file = File::open(path).map_err(|e| failure(path, PipelineError::io(path, e)))?;
    let reader = io::BufReader::new(file);
    let source = path.display().to_string();

    match load_lines(conn, station_id, &source, reader.lines(), dedup, cancel) {
        Ok(load) => {
            info!(
                "File {}: {} new records inserted ({} duplicates, {} bad lines)",
                source,
                load.rows_inserted(),
                load.duplicates,
                load.parse_errors + load.storage_errors
            );
            Ok(FileReport {
                file: path.to_path_buf(),
                station_code: station_code.to_string(),
                station_id,
                load,
            })
        }
        Err((partial, e)) => Err(FileFailure {
            file: path.to_path_buf(),
            error: PipelineError::io(path, e),
            partial,
        }),
    }
}

fn failure(file: &Path, error: PipelineError) -> FileFailure {
    FileFailure {
        file: file.to_path_buf(),
        error,
        partial: LoadReport::default(),
    }
}

fn log_summary(report: &IngestReport) {
    let totals = &report.totals;
    info!(
        "Total records inserted: {} ({} replaced, {} duplicates skipped, {} superseded, {} parse errors, {} storage errors)",
        report.rows_inserted(),
        totals.replaced,
        totals.duplicates,
        totals.superseded,
        totals.parse_errors,
        totals.storage_errors
    );
    info!(
        "Files: {} loaded, {} failed, {} unmapped",
        report.files.len(),
        report.failures.len(),
        report.unmapped.len()
    );
    if report.cancelled {
        warn!(
            "Ingestion cancelled; {} files not started",
            report.skipped_after_cancel.len()
        );
    }
    info!(
        "Data ingestion completed at {}; total duration: {}",
        report.finished_at,
        report.elapsed()
    );
}

fn make_progress_bar(files: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress_bar = ProgressBar::new(files as u64).with_message("Processing files");
    let template = "[{eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}";
    if let Ok(style) = ProgressStyle::with_template(template) {
        progress_bar.set_style(style.progress_chars("##-"));
    }
    progress_bar
}

// -- Tests -------------------------------------------------------------------
