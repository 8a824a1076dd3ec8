use crate::sources::{parse_timestamp, send_batches, RowSource};
use crate::types::{Config, EventRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;

/// Header row `timestamp,value,is_trade,id`; everything but the timestamp may be empty
#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    value: Option<f64>,
    is_trade: Option<bool>,
    id: Option<i64>,
}

pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn parse<R: Read>(input: R) -> Result<Vec<EventRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(input);

        let mut rows = Vec::new();
        for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
            let row = result.with_context(|| format!("bad csv record {}", line + 1))?;
            rows.push(EventRecord {
                timestamp: parse_timestamp(&row.timestamp)?,
                value: row.value,
                is_trade: row.is_trade,
                id: row.id,
            });
        }
        Ok(rows)
    }
}

#[async_trait]
impl RowSource for CsvSource {
    async fn fetch_rows(&self, _config: &Config, tx: mpsc::Sender<Vec<EventRecord>>) -> Result<()> {
        let path = self.path.clone();
        let rows = tokio::task::spawn_blocking(move || -> Result<Vec<EventRecord>> {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Self::parse(file)
        })
        .await??;

        let total = send_batches(rows, &tx).await?;
        info!("Read {} rows from {}", total, self.path.display());
        Ok(())
    }
}
