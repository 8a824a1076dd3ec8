//! Built-in window reducer summarising price behaviour around a signal

use super::performance::{PRICE_SLOT, TIME_SLOT, TRADE_SLOT};
use super::WindowReducer;
use crate::store::{iter_rows, RowRef};
use crate::types::micros_to_secs;
use serde::{Deserialize, Serialize};

/// Slot of the signal strength when the window carries `(quantity, signal)` extras
pub const DEFAULT_SIGNAL_SLOT: usize = 4;

/// Price excursions relative to the most recent row of a window.
///
/// All excursions are `price - anchor_price`; `anchor_time` is in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub anchor_time: f64,
    pub signal: f64,
    pub direction: f64,
    pub time_weighted_excess: f64,
    pub min_excursion: f64,
    pub max_excursion: f64,
    pub first_excursion: f64,
    pub anchor_price: f64,
}

impl PerformanceSummary {
    pub fn to_array(&self) -> [f64; 8] {
        [
            self.anchor_time,
            self.signal,
            self.direction,
            self.time_weighted_excess,
            self.min_excursion,
            self.max_excursion,
            self.first_excursion,
            self.anchor_price,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryReducer {
    signal_slot: usize,
}

impl Default for SummaryReducer {
    fn default() -> Self {
        Self {
            signal_slot: DEFAULT_SIGNAL_SLOT,
        }
    }
}

impl SummaryReducer {
    pub fn new(signal_slot: usize) -> Self {
        Self { signal_slot }
    }

    fn signal(&self, row: &RowRef<'_>) -> f64 {
        row.get::<f64>(self.signal_slot).unwrap_or(0.0)
    }
}

fn is_trade(row: &RowRef<'_>) -> bool {
    row.get::<bool>(TRADE_SLOT).unwrap_or(false)
}

fn price(row: &RowRef<'_>) -> f64 {
    row.get::<f64>(PRICE_SLOT).unwrap_or(0.0)
}

fn time(row: &RowRef<'_>) -> i64 {
    row.get::<i64>(TIME_SLOT).unwrap_or(0)
}

impl WindowReducer for SummaryReducer {
    type Output = PerformanceSummary;

    fn reduce(&self, rows: &[u8], row_size: usize) -> PerformanceSummary {
        if row_size == 0 {
            return PerformanceSummary::default();
        }
        let rows: Vec<RowRef<'_>> = iter_rows(rows, row_size).collect();
        let Some((anchor, history)) = rows.split_last() else {
            return PerformanceSummary::default();
        };

        let anchor_price = price(anchor);
        let anchor_time = time(anchor);
        let signal = self.signal(anchor);

        // integrate backwards over trades until a signal of the opposite sign
        let mut cursor = anchor_time;
        let mut excess = 0.0;
        for row in rows.iter().rev() {
            if is_trade(row) {
                excess += (price(row) - anchor_price) * micros_to_secs(cursor - time(row));
                cursor = time(row);
            } else if signal * self.signal(row) < 0.0 {
                break;
            }
        }
        let span = micros_to_secs(anchor_time - cursor);

        let mut min = anchor_price;
        let mut max = anchor_price;
        let mut first = None;
        for row in history.iter().filter(|row| is_trade(row)) {
            let p = price(row);
            min = min.min(p);
            max = max.max(p);
            first.get_or_insert(p);
        }

        PerformanceSummary {
            anchor_time: micros_to_secs(anchor_time),
            signal,
            direction: if signal > 0.0 { 1.0 } else { -1.0 },
            time_weighted_excess: if span > 0.0 { excess / span } else { 0.0 },
            min_excursion: min - anchor_price,
            max_excursion: max - anchor_price,
            first_excursion: first.map_or(0.0, |p| p - anchor_price),
            anchor_price,
        }
    }
}
