use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parquet::arrow::ArrowWriter;
use series_engine::output::OutputWriter;
use series_engine::sources::csv_file::CsvSource;
use series_engine::sources::parquet_file::ParquetSource;
use series_engine::sources::synthetic::SyntheticSource;
use series_engine::sources::create_source;
use series_engine::types::{Config, DataSource, EventRecord, GenerativeModel, Interval, Operator, OutputFormat, OutputRow};
use series_engine::Pipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

const SIGNAL_CSV: &str = "\
timestamp,value,is_trade,id
0,100.0,true,
1000000,,false,
100000000,200.0,true,
";

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Base test config builder
fn test_config(operator: Operator, source: DataSource) -> Config {
    Config {
        source,
        operator,
        step: Interval::from_secs(60),
        retention: Interval::from_secs(60),
        start: None,
        constant: false,
        include_original: false,
        separate_rows: false,
        from: start(),
        to: start() + Duration::hours(1),
        out_format: OutputFormat::Parquet,
        output_dir: PathBuf::from("/tmp/series_engine_test_output"),
    }
}

fn gbm() -> GenerativeModel {
    GenerativeModel::GBM {
        mu: 0.0001,
        sigma: 0.2,
        base: 100.0,
        signal_rate: 0.1,
    }
}

#[test]
fn test_synthetic_uniform_resampling() {
    let config = test_config(Operator::Uniform, DataSource::Synthetic(gbm()));
    let rows = SyntheticSource::with_seed(gbm(), 42).generate_rows(&config).unwrap();
    assert!(rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    let mut pipeline = Pipeline::new(&config);
    let output = pipeline.process(&rows).unwrap();

    assert_eq!(output.len(), 59);
    for window in output.windows(2) {
        assert_eq!(window[1].timestamp - window[0].timestamp, 60_000_000);
        assert!(window[1].emitted_at >= window[0].emitted_at);
    }
    assert_eq!(output[0].timestamp, start().timestamp_micros() + 60_000_000);
    assert!(output.iter().all(|r| r.value > 0.0 && r.value.is_finite()));
    assert_eq!(pipeline.skipped(), 0);
}

#[test]
fn test_synthetic_source_is_reproducible_with_seed() {
    let config = test_config(Operator::Uniform, DataSource::Synthetic(gbm()));
    let a = SyntheticSource::with_seed(gbm(), 7).generate_rows(&config).unwrap();
    let b = SyntheticSource::with_seed(gbm(), 7).generate_rows(&config).unwrap();
    assert_eq!(a, b);
    assert!(a.iter().any(|r| r.is_trade == Some(false)));
}

#[test]
fn test_gap_filled_output_ends_at_each_observation() {
    let config = test_config(Operator::GapFilled, DataSource::Synthetic(gbm()));
    let rows = SyntheticSource::with_seed(gbm(), 3).generate_rows(&config).unwrap();

    let output = Pipeline::new(&config).process(&rows).unwrap();
    assert!(!output.is_empty());
    assert!(output.iter().all(|r| r.timestamp <= r.emitted_at));
}

#[test]
fn test_out_of_order_rows_are_skipped() {
    let config = test_config(Operator::Uniform, DataSource::File("events.csv".into()));
    let rows = vec![
        EventRecord { timestamp: 0, value: Some(1.0), is_trade: Some(true), id: None },
        EventRecord { timestamp: 120_000_000, value: Some(3.0), is_trade: Some(true), id: None },
        EventRecord { timestamp: 60_000_000, value: Some(2.0), is_trade: Some(true), id: None },
    ];

    let mut pipeline = Pipeline::new(&config);
    let output = pipeline.process(&rows).unwrap();
    assert_eq!(pipeline.skipped(), 1);
    assert_eq!(pipeline.rows_in(), 2);
    assert_eq!(output.len(), 2);
}

#[tokio::test]
async fn test_performance_window_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("events.csv");
    std::fs::write(&input, SIGNAL_CSV).unwrap();

    let mut config = test_config(Operator::Performance, DataSource::File(input.clone()));
    config.output_dir = dir.path().join("out");

    let source = create_source(&config.source).await.unwrap();
    let (tx, mut rx) = mpsc::channel(10);
    let fetch_config = config.clone();
    let fetch = tokio::spawn(async move { source.fetch_rows(&fetch_config, tx).await });

    let mut rows = Vec::new();
    while let Some(batch) = rx.recv().await {
        rows.extend(batch);
    }
    fetch.await.unwrap().unwrap();
    assert_eq!(rows.len(), 3);

    let output = Pipeline::new(&config).process(&rows).unwrap();
    assert_eq!(output.len(), 2);
    assert!(output.iter().all(|r| r.emitted_at == 1_000_000));

    let path = OutputWriter::new().write_rows(&config, &output).await.unwrap();
    assert_eq!(path.file_name().unwrap(), "performance_events_60000000us.parquet");

    let written = ParquetSource::read(&path).unwrap();
    let timestamps: Vec<i64> = written.iter().map(|r| r.timestamp).collect();
    assert_eq!(timestamps, vec![1_000_000, 0]);
    assert_eq!(written[0].is_trade, Some(false));
    assert_eq!(written[0].value, Some(100.0));
    assert_eq!(written[1].is_trade, Some(true));
    assert_eq!(written[1].id, None);
}

#[tokio::test]
async fn test_csv_output_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(Operator::Performance, DataSource::File("events.csv".into()));
    config.out_format = OutputFormat::Csv;
    config.output_dir = dir.path().to_path_buf();

    let rows = CsvSource::parse(SIGNAL_CSV.as_bytes()).unwrap();
    let output = Pipeline::new(&config).process(&rows).unwrap();
    let path = OutputWriter::new().write_rows(&config, &output).await.unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let read: Vec<OutputRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
    assert_eq!(read, output);
}

#[tokio::test]
async fn test_empty_output_is_not_written() {
    let config = test_config(Operator::Uniform, DataSource::File("events.csv".into()));
    assert!(OutputWriter::new().write_rows(&config, &[]).await.is_err());
}

#[test]
fn test_asof_from_csv() {
    let csv = "\
timestamp,value,is_trade,id
0,10.0,true,1
1000000,,false,
2000000,,false,
3000000,11.0,true,2
4000000,,false,
";
    let config = test_config(Operator::AsOf, DataSource::File("quotes.csv".into()));
    let rows = CsvSource::parse(csv.as_bytes()).unwrap();
    let output = Pipeline::new(&config).process(&rows).unwrap();

    let matched: Vec<(i64, f64, Option<i64>)> = output.iter().map(|r| (r.timestamp, r.value, r.id)).collect();
    assert_eq!(
        matched,
        vec![
            (1_000_000, 10.0, Some(1)),
            (2_000_000, 10.0, Some(1)),
            (4_000_000, 11.0, Some(2)),
        ]
    );
}

#[test]
fn test_malformed_csv_is_rejected() {
    let csv = "timestamp,value,is_trade,id\nnot-a-time,1.0,true,\n";
    assert!(CsvSource::parse(csv.as_bytes()).is_err());

    let csv = "timestamp,value,is_trade,id\n0,abc,true,\n";
    assert!(CsvSource::parse(csv.as_bytes()).is_err());
}

#[test]
fn test_rfc3339_timestamps_are_accepted() {
    let csv = "timestamp,value,is_trade,id\n2024-01-01T00:00:01Z,1.0,true,\n";
    let rows = CsvSource::parse(csv.as_bytes()).unwrap();
    assert_eq!(rows[0].timestamp, start().timestamp_micros() + 1_000_000);
}

fn write_input_parquet(path: &std::path::Path, timestamps: Vec<Option<i64>>) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("timestamp", DataType::Int64, true),
        Field::new("value", DataType::Float64, true),
    ]));
    let values: Vec<f64> = (0..timestamps.len()).map(|i| i as f64).collect();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(timestamps)) as _,
            Arc::new(Float64Array::from(values)) as _,
        ],
    )
    .unwrap();
    let mut writer = ArrowWriter::try_new(std::fs::File::create(path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

#[test]
fn test_parquet_input_without_trade_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.parquet");
    write_input_parquet(&path, vec![Some(0), Some(5_000_000)]);

    let rows = ParquetSource::read(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].timestamp, 5_000_000);
    assert_eq!(rows[1].value, Some(1.0));
    assert_eq!(rows[1].is_trade, None);
}

#[test]
fn test_missing_timestamps_are_rejected_by_every_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gappy.parquet");
    write_input_parquet(&path, vec![Some(0), None, Some(2_000_000)]);

    let err = ParquetSource::read(&path).unwrap_err();
    assert!(err.to_string().contains("row 2"), "{err}");

    let csv = "timestamp,value,is_trade,id
0,1.0,true,
,2.0,true,
";
    assert!(CsvSource::parse(csv.as_bytes()).is_err());
}
