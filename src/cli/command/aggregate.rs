use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::{
    cli::{AggregateArgs, IngestArgs},
    config::Settings,
    db::{aggregate_yearly_stats, AggregationReport, Store},
};

use super::{apply_aggregate_args, apply_ingest_args, ingest};

pub async fn aggregate(mut settings: Settings, args: &AggregateArgs) -> Result<String> {
    apply_aggregate_args(&mut settings, args);
    let report = run_aggregate(&settings).await?;

    Ok(summarise(&report))
}

/// Ingest then aggregate. Aggregation is skipped if ingestion was cancelled.
pub async fn run(
    mut settings: Settings,
    ingest_args: &IngestArgs,
    aggregate_args: &AggregateArgs,
    cancel: CancellationToken,
) -> Result<String> {
    apply_ingest_args(&mut settings, ingest_args);
    apply_aggregate_args(&mut settings, aggregate_args);

    let ingested = ingest::run_ingest(&settings, cancel).await?;
    let mut summary = ingest::summarise(&ingested);
    if ingested.cancelled {
        return Ok(summary);
    }

    let aggregated = run_aggregate(&settings).await?;
    summary.push_str("; ");
    summary.push_str(&summarise(&aggregated));

    Ok(summary)
}

async fn run_aggregate(settings: &Settings) -> Result<AggregationReport> {
    let database = settings.database.clone();
    let timeout = settings.timeout();
    let policy = settings.stats;

    let report = tokio::task::spawn_blocking(move || {
        let mut store = Store::open(&database, timeout)?;
        aggregate_yearly_stats(store.conn_mut(), policy)
    })
    .await??;

    Ok(report)
}

fn summarise(report: &AggregationReport) -> String {
    format!(
        "{} yearly statistics inserted, {} refreshed in {}",
        report.inserted,
        report.refreshed,
        report.elapsed()
    )
}
