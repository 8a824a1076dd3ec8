use crate::sources::{send_batches, RowSource};
use crate::types::{Config, EventRecord};
use anyhow::{anyhow, Context, Result};
use arrow::array::{Array, BooleanArray, Float64Array, Int64Array};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::info;

/// Parquet input with an `Int64` `timestamp` column and optional nullable
/// `value` (`Float64`), `is_trade` (`Boolean`) and `id` (`Int64`) columns
pub struct ParquetSource {
    path: PathBuf,
}

fn optional_column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<Option<&'a T>> {
    match batch.column_by_name(name) {
        None => Ok(None),
        Some(column) => column
            .as_any()
            .downcast_ref::<T>()
            .map(Some)
            .ok_or_else(|| anyhow!("Failed to cast {} column", name)),
    }
}

impl ParquetSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn read(path: &Path) -> Result<Vec<EventRecord>> {
        let file = std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut rows = Vec::new();
        let mut offset = 0;
        for batch_result in reader {
            let batch = batch_result?;
            let timestamps = optional_column::<Int64Array>(&batch, "timestamp")?
                .ok_or_else(|| anyhow!("missing timestamp column"))?;
            let values = optional_column::<Float64Array>(&batch, "value")?;
            let trades = optional_column::<BooleanArray>(&batch, "is_trade")?;
            let ids = optional_column::<Int64Array>(&batch, "id")?;

            for i in 0..batch.num_rows() {
                if timestamps.is_null(i) {
                    anyhow::bail!("null timestamp in row {} of {}", offset + i + 1, path.display());
                }
                rows.push(EventRecord {
                    timestamp: timestamps.value(i),
                    value: values.filter(|a| a.is_valid(i)).map(|a| a.value(i)),
                    is_trade: trades.filter(|a| a.is_valid(i)).map(|a| a.value(i)),
                    id: ids.filter(|a| a.is_valid(i)).map(|a| a.value(i)),
                });
            }
            offset += batch.num_rows();
        }
        Ok(rows)
    }
}

#[async_trait]
impl RowSource for ParquetSource {
    async fn fetch_rows(&self, _config: &Config, tx: mpsc::Sender<Vec<EventRecord>>) -> Result<()> {
        let path = self.path.clone();
        let rows = tokio::task::spawn_blocking(move || Self::read(&path)).await??;

        let total = send_batches(rows, &tx).await?;
        info!("Read {} rows from {}", total, self.path.display());
        Ok(())
    }
}
