//! Drives one aggregator over a single ordered stream of host rows
//!
//! Every input row is accumulated and then finalized, the way a window
//! function evaluates a running frame, and whatever finalize yields is
//! flattened into [`OutputRow`]s.

use crate::aggregation::{
    AsOf, AsOfInput, AsOfMode, Aggregator, Fill, PerformanceWindow, ResampleInput, Resampler,
    WindowInput,
};
use crate::error::Result;
use crate::types::{unstruct, Config, EventRecord, Interval, Observation, Operator, OutputRow};
use tracing::{debug, warn};

enum Engine {
    Resample { resampler: Resampler, step: Interval },
    Window { window: PerformanceWindow, retention: Interval },
    AsOf(AsOf),
}

pub struct Pipeline {
    engine: Engine,
    last_timestamp: Option<i64>,
    rows_in: usize,
    rows_out: usize,
    skipped: usize,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        let engine = match config.operator {
            Operator::Uniform | Operator::GapFilled => {
                let mut resampler = if config.operator == Operator::Uniform {
                    Resampler::uniform()
                } else {
                    Resampler::gap_filled()
                };
                if config.constant {
                    resampler = resampler.with_fill(Fill::Constant);
                }
                resampler = resampler.with_original(config.include_original);
                if let Some(start) = config.start {
                    resampler = resampler.starting_at(start.timestamp_micros());
                }
                Engine::Resample {
                    resampler,
                    step: config.step,
                }
            }
            Operator::Performance => Engine::Window {
                window: PerformanceWindow::new(),
                retention: config.retention,
            },
            Operator::AsOf => Engine::AsOf(AsOf::new(if config.separate_rows {
                AsOfMode::SeparateRows
            } else {
                AsOfMode::Typed
            })),
        };
        Self {
            engine,
            last_timestamp: None,
            rows_in: 0,
            rows_out: 0,
            skipped: 0,
        }
    }

    pub fn rows_in(&self) -> usize {
        self.rows_in
    }

    pub fn rows_out(&self) -> usize {
        self.rows_out
    }

    /// Rows dropped because they arrived before an already processed timestamp
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Feed a batch already sorted by timestamp
    pub fn process(&mut self, records: &[EventRecord]) -> Result<Vec<OutputRow>> {
        let mut out = Vec::new();
        for record in records {
            if self.last_timestamp.is_some_and(|last| record.timestamp < last) {
                warn!(timestamp = record.timestamp, "out of order row skipped");
                self.skipped += 1;
                continue;
            }
            self.last_timestamp = Some(record.timestamp);
            self.rows_in += 1;
            self.step(record, &mut out)?;
        }
        self.rows_out += out.len();
        debug!(rows = records.len(), emitted = out.len(), "processed batch");
        Ok(out)
    }

    fn step(&mut self, record: &EventRecord, out: &mut Vec<OutputRow>) -> Result<()> {
        let emitted_at = record.timestamp;
        match &mut self.engine {
            Engine::Resample { resampler, step } => {
                // signal rows carry no price and count as missing observations
                let observation = match record.is_trade {
                    Some(false) => None,
                    _ => record.value.map(|v| Observation::new(record.timestamp, v)),
                };
                resampler.accumulate(ResampleInput::new(observation, *step))?;
                if let Some(series) = resampler.finalize()? {
                    out.extend(unstruct(&series.timestamps, &series.values)?.into_iter().map(|p| OutputRow {
                        emitted_at,
                        timestamp: p.timestamp,
                        value: p.value,
                        is_trade: None,
                        id: None,
                    }));
                }
            }
            Engine::Window { window, retention } => {
                window.accumulate(WindowInput {
                    is_trade: record.is_trade,
                    timestamp: Some(record.timestamp),
                    price: record.value,
                    retention: Some(*retention),
                    extras: Vec::new(),
                })?;
                if let Some(series) = window.finalize()? {
                    out.extend(series.rows().into_iter().map(|row| OutputRow {
                        emitted_at,
                        timestamp: row.timestamp,
                        value: row.price,
                        is_trade: Some(row.is_trade),
                        id: None,
                    }));
                }
            }
            Engine::AsOf(asof) => {
                asof.accumulate(AsOfInput {
                    price: record.value,
                    id: record.id,
                    is_quote: record.is_trade,
                })?;
                if let Some(quote) = asof.finalize()? {
                    out.push(OutputRow {
                        emitted_at,
                        timestamp: record.timestamp,
                        value: quote.value,
                        is_trade: Some(false),
                        id: Some(quote.id),
                    });
                }
            }
        }
        Ok(())
    }
}
