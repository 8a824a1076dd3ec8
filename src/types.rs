use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rows reserved by a fresh row store before the first growth
pub const DEFAULT_INITIAL_ROWS: usize = 2000;
pub const USECS_PER_SEC: i64 = 1_000_000;
pub const USECS_PER_DAY: i64 = 86_400 * USECS_PER_SEC;
/// Fixed month length used when turning a calendar interval into microseconds
pub const DAYS_PER_MONTH: i64 = 30;
/// Rows buffered by the host before a batch is sorted and fed to an aggregator
pub const STREAMING_BUFFER_SIZE: usize = 100_000;

/// Convert microseconds since epoch to fractional seconds
pub fn micros_to_secs(micros: i64) -> f64 {
    micros as f64 / USECS_PER_SEC as f64
}

/// Convert fractional seconds back to microseconds (truncating)
pub fn secs_to_micros(secs: f64) -> i64 {
    (secs * USECS_PER_SEC as f64) as i64
}

/// A calendar interval: months, days and a microsecond clock component.
///
/// Months and days are kept apart because they only have a fixed length by
/// convention (30 days per month, 24 hours per day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

impl Interval {
    pub const fn new(months: i32, days: i32, micros: i64) -> Self {
        Self { months, days, micros }
    }

    pub const fn from_micros(micros: i64) -> Self {
        Self::new(0, 0, micros)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self::new(0, 0, secs * USECS_PER_SEC)
    }

    pub const fn from_days(days: i32) -> Self {
        Self::new(0, days, 0)
    }

    pub const fn from_months(months: i32) -> Self {
        Self::new(months, 0, 0)
    }

    /// Total length in microseconds with the 30-day month approximation
    pub fn total_micros(&self) -> Result<i64> {
        let overflow = || EngineError::invalid_interval(*self, "length overflows microseconds");
        let months = (self.months as i64)
            .checked_mul(DAYS_PER_MONTH * USECS_PER_DAY)
            .ok_or_else(overflow)?;
        let days = (self.days as i64).checked_mul(USECS_PER_DAY).ok_or_else(overflow)?;
        months
            .checked_add(days)
            .and_then(|m| m.checked_add(self.micros))
            .ok_or_else(overflow)
    }

    /// Retention length in microseconds; must be strictly positive
    pub fn retention_micros(&self) -> Result<i64> {
        let micros = self.total_micros()?;
        if micros <= 0 {
            return Err(EngineError::invalid_interval(*self, "retention must be positive"));
        }
        Ok(micros)
    }

    /// Resampling step in whole seconds.
    ///
    /// Months have no fixed length as a step unit and are rejected. Sub-second
    /// remainders are truncated, so anything shorter than one second is invalid.
    pub fn step_seconds(&self) -> Result<f64> {
        if self.months != 0 {
            return Err(EngineError::invalid_interval(
                *self,
                "months are not supported as a step unit",
            ));
        }
        let micros = (self.days as i64)
            .checked_mul(USECS_PER_DAY)
            .and_then(|d| d.checked_add(self.micros))
            .ok_or_else(|| EngineError::invalid_interval(*self, "step overflows microseconds"))?;
        let secs = micros / USECS_PER_SEC;
        if secs <= 0 {
            return Err(EngineError::invalid_interval(*self, "step must be at least one second"));
        }
        Ok(secs as f64)
    }
}

/// A raw observation fed to the resamplers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: i64, // microseconds since epoch
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One point of a finalized output series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: i64, // microseconds since epoch
    pub value: f64,
}

/// Two parallel sequences produced by the resamplers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResampledSeries {
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
}

impl ResampledSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn push(&mut self, timestamp: i64, value: f64) {
        self.timestamps.push(timestamp);
        self.values.push(value);
    }
}

/// Zip two parallel sequences back into points
pub fn unstruct(timestamps: &[i64], values: &[f64]) -> Result<Vec<SeriesPoint>> {
    if timestamps.len() != values.len() {
        return Err(EngineError::validation(format!(
            "number of elements must be the same in both sequences ({} vs {})",
            timestamps.len(),
            values.len()
        )));
    }
    Ok(timestamps
        .iter()
        .zip(values)
        .map(|(&timestamp, &value)| SeriesPoint { timestamp, value })
        .collect())
}

/// One row of a finalized performance window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowRow {
    pub price: f64,
    pub is_trade: bool,
    pub timestamp: i64, // microseconds since epoch
}

/// A row as the host reads it from a source, before it is shaped for an operator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: i64, // microseconds since epoch
    pub value: Option<f64>,
    pub is_trade: Option<bool>,
    pub id: Option<i64>,
}

/// One flattened row of host output.
///
/// `emitted_at` is the timestamp of the input row whose finalize produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub emitted_at: i64,
    pub timestamp: i64,
    pub value: f64,
    pub is_trade: Option<bool>,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Uniform,
    GapFilled,
    Performance,
    AsOf,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Uniform => write!(f, "uniform"),
            Operator::GapFilled => write!(f, "gapfill"),
            Operator::Performance => write!(f, "performance"),
            Operator::AsOf => write!(f, "asof"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Csv,
}

#[derive(Debug, Clone)]
pub enum DataSource {
    File(PathBuf),
    Synthetic(GenerativeModel),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerativeModel {
    /// Geometric Brownian motion prices with Bernoulli signal rows
    GBM { mu: f64, sigma: f64, base: f64, signal_rate: f64 },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: DataSource,
    pub operator: Operator,
    pub step: Interval,
    pub retention: Interval,
    pub start: Option<DateTime<Utc>>,
    pub constant: bool,
    pub include_original: bool,
    /// As-of mode where any row with a value and an id counts as a quote
    pub separate_rows: bool,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub out_format: OutputFormat,
    pub output_dir: PathBuf,
}
