pub mod csv_file;
pub mod parquet_file;
pub mod synthetic;

use crate::types::{Config, DataSource, EventRecord};
use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use tokio::sync::mpsc;

/// Rows sent per channel message
pub const SOURCE_BATCH_SIZE: usize = 10_000;

#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(&self, config: &Config, tx: mpsc::Sender<Vec<EventRecord>>) -> Result<()>;
}

pub async fn create_source(source: &DataSource) -> Result<Box<dyn RowSource>> {
    match source {
        DataSource::File(path) => match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Ok(Box::new(csv_file::CsvSource::new(path.clone()))),
            Some("parquet") => Ok(Box::new(parquet_file::ParquetSource::new(path.clone()))),
            _ => anyhow::bail!("Unsupported input file: {}", path.display()),
        },
        DataSource::Synthetic(model) => Ok(Box::new(synthetic::SyntheticSource::new(model.clone()))),
    }
}

/// Microseconds since epoch from either an integer or an RFC 3339 string
pub fn parse_timestamp(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(micros) = raw.parse::<i64>() {
        return Ok(micros);
    }
    Ok(DateTime::parse_from_rfc3339(raw)?.timestamp_micros())
}

/// Send rows in fixed-size batches, returning how many were sent
pub async fn send_batches(rows: Vec<EventRecord>, tx: &mpsc::Sender<Vec<EventRecord>>) -> Result<usize> {
    let total = rows.len();
    for chunk in rows.chunks(SOURCE_BATCH_SIZE) {
        tx.send(chunk.to_vec()).await?;
    }
    Ok(total)
}
