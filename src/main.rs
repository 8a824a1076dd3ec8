mod cli;

use cli::Args;
use series_engine::display::display_output_table;
use series_engine::output::OutputWriter;
use series_engine::sources::create_source;
use series_engine::types::{EventRecord, OutputRow, STREAMING_BUFFER_SIZE};
use series_engine::Pipeline;

use anyhow::Result;
use clap::Parser;
use rayon::prelude::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let num_threads = std::thread::available_parallelism()
        .map(|x| x.get())
        .unwrap_or(4)
        .max(4);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("rayon-worker-{}", i))
        .build_global()?;
    info!("Initialized Rayon thread pool with {} threads", num_threads);

    let args = Args::parse();
    let config = Arc::new(args.into_config()?);

    info!("Starting series engine with config: {:?}", config);
    info!("Output directory: {}", config.output_dir.display());

    let source = create_source(&config.source).await?;

    let (row_tx, mut row_rx) = mpsc::channel::<Vec<EventRecord>>(100);
    let (out_tx, mut out_rx) = mpsc::channel::<Vec<OutputRow>>(50);

    let config_for_fetch = config.clone();
    let fetch_task = tokio::spawn(async move {
        if let Err(e) = source.fetch_rows(&config_for_fetch, row_tx).await {
            error!("Error reading rows: {}", e);
        }
    });

    // One logical group: a single pipeline consumes every row in order
    let config_for_agg = config.clone();
    let aggregation_task = tokio::spawn(async move {
        let mut pipeline = Pipeline::new(&config_for_agg);
        let mut buffer: Vec<EventRecord> = Vec::new();

        while let Some(batch) = row_rx.recv().await {
            buffer.extend(batch);
            if buffer.len() >= STREAMING_BUFFER_SIZE {
                buffer.par_sort_by_key(|r| r.timestamp);
                let rows = pipeline.process(&buffer)?;
                if !rows.is_empty() {
                    let _ = out_tx.send(rows).await;
                }
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            buffer.par_sort_by_key(|r| r.timestamp);
            let rows = pipeline.process(&buffer)?;
            if !rows.is_empty() {
                let _ = out_tx.send(rows).await;
            }
        }

        info!(
            "Processed {} rows into {} output rows ({} skipped out of order)",
            pipeline.rows_in(),
            pipeline.rows_out(),
            pipeline.skipped()
        );
        anyhow::Ok(())
    });

    let mut all_rows = Vec::new();
    while let Some(batch) = out_rx.recv().await {
        all_rows.extend(batch);
    }

    fetch_task.await?;
    aggregation_task.await??;

    if all_rows.is_empty() {
        warn!("No output generated. Exiting.");
        return Ok(());
    }

    let output_writer = OutputWriter::new();
    let output_path = output_writer.write_rows(&config, &all_rows).await?;

    display_output_table(&all_rows);

    info!("Series engine completed successfully!");
    if let Some(filename) = output_path.file_name() {
        info!("Generated: {}", filename.to_string_lossy());
    }
    info!("Total output rows: {}", all_rows.len());

    Ok(())
}
