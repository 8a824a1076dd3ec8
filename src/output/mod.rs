use crate::types::{Config, DataSource, Operator, OutputFormat, OutputRow};
use anyhow::Result;
use arrow::array::{BooleanArray, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes finalized operator output to Parquet or CSV
#[derive(Debug, Default)]
pub struct OutputWriter;

impl OutputWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write rows into `config.output_dir`, returning the file written
    pub async fn write_rows(&self, config: &Config, rows: &[OutputRow]) -> Result<PathBuf> {
        if rows.is_empty() {
            anyhow::bail!("No output rows to write");
        }
        std::fs::create_dir_all(&config.output_dir)?;
        let output_path = config.output_dir.join(self.generate_filename(config)?);

        match config.out_format {
            OutputFormat::Parquet => write_parquet(&output_path, rows)?,
            OutputFormat::Csv => write_csv(&output_path, rows)?,
        }
        Ok(output_path)
    }

    fn generate_filename(&self, config: &Config) -> Result<String> {
        let source = match &config.source {
            DataSource::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_lowercase())
                .unwrap_or_else(|| "input".to_string()),
            DataSource::Synthetic(_) => "gbm".to_string(),
        };
        let param = match config.operator {
            Operator::Uniform | Operator::GapFilled => format!("{}us", config.step.total_micros()?),
            Operator::Performance => format!("{}us", config.retention.total_micros()?),
            Operator::AsOf => "quotes".to_string(),
        };
        let ext = match config.out_format {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        };
        Ok(format!("{}_{}_{}.{}", config.operator, source, param, ext))
    }
}

pub fn output_schema() -> Schema {
    Schema::new(vec![
        Field::new("emitted_at", DataType::Int64, false),
        Field::new("timestamp", DataType::Int64, false),
        Field::new("value", DataType::Float64, false),
        Field::new("is_trade", DataType::Boolean, true),
        Field::new("id", DataType::Int64, true),
    ])
}

fn write_parquet(path: &Path, rows: &[OutputRow]) -> Result<()> {
    let schema = Arc::new(output_schema());
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.emitted_at))) as _,
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.timestamp))) as _,
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.value))) as _,
            Arc::new(rows.iter().map(|r| r.is_trade).collect::<BooleanArray>()) as _,
            Arc::new(rows.iter().map(|r| r.id).collect::<Int64Array>()) as _,
        ],
    )?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_csv(path: &Path, rows: &[OutputRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
