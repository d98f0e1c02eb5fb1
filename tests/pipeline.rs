use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wxdb::{
    db::{
        aggregate_yearly_stats, count_rows,
        query::{observations, yearly_stats, ObservationFilter, StatsFilter, YearlyStat},
        list_stations, DedupPolicy, StatsPolicy, Store, Table,
    },
    ingest::{ingest_directory, IngestOptions},
    reading::StationMapping,
};

struct Fixture {
    _dir: TempDir,
    data_dir: PathBuf,
    options: IngestOptions,
}

fn fixture(files: &[(&str, &str)]) -> Fixture {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let data_dir = dir.path().join("wx_data");
    fs::create_dir(&data_dir).unwrap();
    for (name, body) in files {
        fs::write(data_dir.join(name), body).unwrap();
    }

    let options = IngestOptions {
        database: dir.path().join("weather.sqlite"),
        timeout: Duration::from_secs(5),
        workers: 4,
        dedup: DedupPolicy::FullTuple,
        mapping: StationMapping::FileStem,
        show_progress: false,
    };

    Fixture {
        _dir: dir,
        data_dir,
        options,
    }
}

fn open(path: &Path) -> Store {
    Store::open(path, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let fx = fixture(&[("USC001.txt", "20240101\t289\t-50\t0\n20240102\t300\t-9999\t25\n")]);

    let report = ingest_directory(&fx.data_dir, &fx.options, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.rows_inserted(), 2);
    assert_eq!(report.files[0].station_code, "USC001");

    let mut store = open(&fx.options.database);
    let station_id = report.files[0].station_id;

    let page = observations(
        store.conn(),
        &ObservationFilter {
            station_id: Some(station_id),
            date: NaiveDate::from_ymd_opt(2024, 1, 2),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(page.data[0].min_temp, None);

    let aggregated = aggregate_yearly_stats(store.conn_mut(), StatsPolicy::Freeze).unwrap();
    assert_eq!(aggregated.inserted, 1);
    assert_eq!(
        yearly_stats(store.conn(), &StatsFilter::default()).unwrap(),
        vec![YearlyStat {
            station_id,
            year: 2024,
            avg_max_temp: 28.9,
            avg_min_temp: -5.0,
            total_precipitation: 0.0,
        }]
    );
}

#[tokio::test]
async fn test_ingestion_is_idempotent() {
    let fx = fixture(&[
        ("USC001.txt", "20240101\t289\t-50\t0\n20240102\t300\t-9999\t25\n"),
        ("USC002.txt", "20240101\t100\t0\t3\n20240101\t100\t0\t3\n"),
        ("USC003.txt", "19991231\t-9999\t-9999\t-9999\n"),
    ]);

    let first = ingest_directory(&fx.data_dir, &fx.options, CancellationToken::new())
        .await
        .unwrap();
    let rows_after_first = count_rows(open(&fx.options.database).conn(), Table::Observations).unwrap();

    let second = ingest_directory(&fx.data_dir, &fx.options, CancellationToken::new())
        .await
        .unwrap();
    let store = open(&fx.options.database);

    assert_eq!(first.rows_inserted(), 4);
    assert_eq!(first.totals.duplicates, 1);
    assert_eq!(second.rows_inserted(), 0);
    assert_eq!(second.totals.duplicates, 5);
    assert_eq!(count_rows(store.conn(), Table::Observations).unwrap(), rows_after_first);
    assert_eq!(list_stations(store.conn()).unwrap().len(), 3);
}

#[tokio::test]
async fn test_aggregation_is_idempotent() {
    let fx = fixture(&[("USC001.txt", "20230101\t10\t0\t1\n20240101\t20\t0\t2\n")]);
    ingest_directory(&fx.data_dir, &fx.options, CancellationToken::new())
        .await
        .unwrap();

    let mut store = open(&fx.options.database);
    let first = aggregate_yearly_stats(store.conn_mut(), StatsPolicy::Freeze).unwrap();
    let second = aggregate_yearly_stats(store.conn_mut(), StatsPolicy::Freeze).unwrap();

    assert_eq!(first.inserted, 2);
    assert_eq!(second.inserted, 0);
    assert_eq!(count_rows(store.conn(), Table::YearlyStats).unwrap(), 2);
}

#[tokio::test]
async fn test_bad_lines_do_not_abort_file() {
    let fx = fixture(&[
        ("USC001.txt", "20240101\t289\t-50\t0\nnot a line\n20240199\t1\t1\t1\n20240103\t1\t1\t1\n"),
        ("USC002.txt", "20240101\t1\t1\t1\n"),
    ]);

    let report = ingest_directory(&fx.data_dir, &fx.options, CancellationToken::new())
        .await
        .unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.totals.parse_errors, 2);
    assert_eq!(report.rows_inserted(), 3);
}

#[tokio::test]
async fn test_unreadable_file_is_skipped() {
    let fx = fixture(&[("USC001.txt", "20240101\t1\t1\t1\n")]);
    fs::write(fx.data_dir.join("USC002.txt"), [0xff, 0xfe, b'\n']).unwrap();

    let report = ingest_directory(&fx.data_dir, &fx.options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].file.ends_with("USC002.txt"));
    assert_eq!(report.rows_inserted(), 1);
}

#[tokio::test]
async fn test_explicit_station_mapping() {
    let mut fx = fixture(&[
        ("a.txt", "20240101\t1\t1\t1\n"),
        ("b.txt", "20240101\t2\t2\t2\n"),
    ]);
    fx.options.mapping = StationMapping::from_lines(["a.txt\tUSC00110072"]).unwrap();

    let report = ingest_directory(&fx.data_dir, &fx.options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].station_code, "USC00110072");
    assert_eq!(report.unmapped.len(), 1);
}

#[tokio::test]
async fn test_cancelled_run_starts_no_files() {
    let fx = fixture(&[("USC001.txt", "20240101\t1\t1\t1\n")]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = ingest_directory(&fx.data_dir, &fx.options, cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.skipped_after_cancel.len(), 1);
    assert_eq!(report.rows_inserted(), 0);
}

#[tokio::test]
async fn test_station_date_policy_replaces_revisions() {
    let mut fx = fixture(&[("USC001.txt", "20240101\t289\t-50\t0\n")]);
    fx.options.dedup = DedupPolicy::StationDate;
    ingest_directory(&fx.data_dir, &fx.options, CancellationToken::new())
        .await
        .unwrap();

    fs::write(fx.data_dir.join("USC001.txt"), "20240101\t291\t-50\t0\n").unwrap();
    let report = ingest_directory(&fx.data_dir, &fx.options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.totals.replaced, 1);
    let store = open(&fx.options.database);
    assert_eq!(count_rows(store.conn(), Table::Observations).unwrap(), 1);
}

#[tokio::test]
async fn test_station_date_policy_is_idempotent_with_revisions_in_one_file() {
    let mut fx = fixture(&[("USC001.txt", "20240101\t289\t-50\t0\n20240101\t291\t-50\t0\n")]);
    fx.options.dedup = DedupPolicy::StationDate;

    let first = ingest_directory(&fx.data_dir, &fx.options, CancellationToken::new())
        .await
        .unwrap();
    let second = ingest_directory(&fx.data_dir, &fx.options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.rows_inserted(), 1);
    assert_eq!(first.totals.superseded, 1);
    assert_eq!(second.rows_inserted(), 0);
    assert_eq!(second.totals.replaced, 0);
    assert_eq!(second.totals.duplicates, 1);

    let store = open(&fx.options.database);
    let page = observations(store.conn(), &ObservationFilter::default()).unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].max_temp, Some(29.1));
}
