//! Signal-anchored retention window over trade rows
//!
//! Rows are packed into a [`RowStore`] as `[trade, timestamp, price, extras.., status]`,
//! one slot each. A signal row (trade flag false) stays pending until a
//! finalize resolves it; at that point every row older than the retention
//! interval before the signal is evicted and the surviving window is emitted.

use super::Aggregator;
use crate::error::{EngineError, Result};
use crate::store::{check_fixed_width, ColumnType, FieldValue, RowStore, SLOT_WIDTH};
use crate::types::{Interval, WindowRow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const TRADE_SLOT: usize = 0;
pub const TIME_SLOT: usize = 1;
pub const PRICE_SLOT: usize = 2;
/// Slots before the caller's extra columns
pub const LEADING_SLOTS: usize = 3;

/// One accumulate call. Everything is optional so that missing arguments are
/// reported the way a host passing nulls would see them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowInput {
    pub is_trade: Option<bool>,
    pub timestamp: Option<i64>,
    pub price: Option<f64>,
    /// Only read on the first call of a group
    pub retention: Option<Interval>,
    pub extras: Vec<FieldValue>,
}

impl WindowInput {
    pub fn trade(timestamp: i64, price: f64) -> Self {
        Self {
            is_trade: Some(true),
            timestamp: Some(timestamp),
            price: Some(price),
            ..Default::default()
        }
    }

    pub fn signal(timestamp: i64) -> Self {
        Self {
            is_trade: Some(false),
            timestamp: Some(timestamp),
            ..Default::default()
        }
    }

    pub fn with_retention(mut self, retention: Interval) -> Self {
        self.retention = Some(retention);
        self
    }

    pub fn with_extras(mut self, extras: Vec<FieldValue>) -> Self {
        self.extras = extras;
        self
    }
}

/// Bookkeeping kept beside the row store
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowHeader {
    pub row_size: usize,
    /// Microseconds, always positive once initialized
    pub retention: i64,
    pub last_signal_time: i64,
    pub last_cleanup_time: i64,
    pub last_trade_price: f64,
    pub live_signals: usize,
    pub calls: u64,
}

/// The surviving window, most recent row first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSeries {
    pub prices: Vec<f64>,
    pub trades: Vec<bool>,
    pub timestamps: Vec<i64>,
}

impl WindowSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn rows(&self) -> Vec<WindowRow> {
        self.prices
            .iter()
            .zip(&self.trades)
            .zip(&self.timestamps)
            .map(|((&price, &is_trade), &timestamp)| WindowRow {
                price,
                is_trade,
                timestamp,
            })
            .collect()
    }
}

/// Final reduction over the raw live-window bytes, oldest row first
pub trait WindowReducer {
    type Output;

    fn reduce(&self, rows: &[u8], row_size: usize) -> Self::Output;
}

impl<F, T> WindowReducer for F
where
    F: Fn(&[u8], usize) -> T,
{
    type Output = T;

    fn reduce(&self, rows: &[u8], row_size: usize) -> T {
        self(rows, row_size)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceWindow {
    columns: Vec<ColumnType>,
    header: WindowHeader,
    store: Option<RowStore>,
}

impl PerformanceWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the types of the extra columns carried after the price
    pub fn with_columns(columns: Vec<ColumnType>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn header(&self) -> &WindowHeader {
        &self.header
    }

    pub fn store(&self) -> Option<&RowStore> {
        self.store.as_ref()
    }

    pub fn live_signal_count(&self) -> usize {
        self.header.live_signals
    }

    pub fn dead_count(&self) -> usize {
        self.store.as_ref().map_or(0, RowStore::dead_count)
    }

    pub fn live_count(&self) -> usize {
        self.store.as_ref().map_or(0, RowStore::live_count)
    }

    fn status_slot(&self) -> usize {
        LEADING_SLOTS + self.columns.len()
    }

    fn row_size(&self) -> usize {
        (self.status_slot() + 1) * SLOT_WIDTH
    }

    /// Header and empty store for the first call; nothing is committed here
    fn prepare(&self, input: &WindowInput, timestamp: i64) -> Result<(WindowHeader, RowStore)> {
        let retention = input
            .retention
            .ok_or_else(|| EngineError::missing("retention interval"))?
            .retention_micros()?;
        check_fixed_width(&self.columns)?;

        let row_size = self.row_size();
        let store = RowStore::reserve_initial(row_size)?;
        let header = WindowHeader {
            row_size,
            retention,
            last_cleanup_time: timestamp,
            ..Default::default()
        };
        Ok((header, store))
    }

    fn commit(&mut self, header: WindowHeader, store: RowStore) {
        debug!(
            row_size = header.row_size,
            retention = header.retention,
            capacity = store.capacity(),
            "performance window initialized"
        );
        self.header = header;
        self.store = Some(store);
    }

    fn encode_row(&self, is_trade: bool, timestamp: i64, price: f64, extras: &[FieldValue]) -> Result<Vec<u8>> {
        if extras.len() != self.columns.len() {
            return Err(EngineError::validation(format!(
                "expected {} extra columns, got {}",
                self.columns.len(),
                extras.len()
            )));
        }
        let mut row = Vec::with_capacity(self.row_size());
        row.extend_from_slice(&FieldValue::Bool(is_trade).to_slot(TRADE_SLOT)?);
        row.extend_from_slice(&FieldValue::Int64(timestamp).to_slot(TIME_SLOT)?);
        row.extend_from_slice(&FieldValue::Float64(price).to_slot(PRICE_SLOT)?);
        for (i, (value, ty)) in extras.iter().zip(&self.columns).enumerate() {
            if !value.matches(*ty) {
                return Err(EngineError::validation(format!(
                    "extra column {i} expects {}, got {value:?}",
                    ty.name()
                )));
            }
            row.extend_from_slice(&value.to_slot(LEADING_SLOTS + i)?);
        }
        row.extend_from_slice(&FieldValue::Bool(true).to_slot(self.status_slot())?);
        Ok(row)
    }

    /// Evict expired rows and resolve the oldest pending signal.
    ///
    /// Returns true when a signal was resolved, which is the only case where
    /// finalize has output.
    fn sweep(&mut self) -> Result<bool> {
        let status_slot = self.status_slot();
        let header = &mut self.header;
        let Some(store) = self.store.as_mut() else {
            return Ok(false);
        };
        let Some(latest) = store.live_rows().next_back().and_then(|r| r.get::<i64>(TIME_SLOT)) else {
            return Ok(false);
        };
        if header.live_signals == 0
            && latest.saturating_sub(header.last_cleanup_time) <= header.retention.saturating_mul(2)
        {
            return Ok(false);
        }
        header.last_cleanup_time = latest;

        let first_live = store.dead_count();
        let pending = store
            .live_rows()
            .enumerate()
            .find(|(_, row)| {
                row.get::<bool>(TRADE_SLOT) == Some(false) && row.get::<bool>(status_slot) == Some(true)
            })
            .and_then(|(offset, row)| Some((first_live + offset, row.get::<i64>(TIME_SLOT)?)));
        let boundary = pending.map_or(latest, |(_, time)| time);

        let retention = header.retention;
        let expired = store
            .live_rows()
            .take_while(|row| {
                row.get::<i64>(TIME_SLOT)
                    .is_some_and(|t| boundary.saturating_sub(t) > retention)
            })
            .count();
        if expired > 0 {
            store.retire_front(expired);
            debug!(expired, boundary, dead = store.dead_count(), "evicted rows past retention");
        }

        let Some((index, signal_time)) = pending else {
            return Ok(false);
        };
        store.set_slot(index, status_slot, false)?;
        header.live_signals = header.live_signals.saturating_sub(1);
        debug!(
            signal_time,
            window = store.live_count(),
            pending = header.live_signals,
            "resolved signal"
        );
        Ok(true)
    }

    /// Raw bytes of the live window, oldest first
    pub fn live_bytes(&self) -> &[u8] {
        self.store.as_ref().map_or(&[][..], RowStore::live_bytes)
    }

    pub fn series(&self) -> WindowSeries {
        let mut out = WindowSeries::default();
        let Some(store) = self.store.as_ref() else {
            return out;
        };
        for row in store.live_rows().rev() {
            out.prices.push(row.get(PRICE_SLOT).unwrap_or_default());
            out.trades.push(row.get(TRADE_SLOT).unwrap_or_default());
            out.timestamps.push(row.get(TIME_SLOT).unwrap_or_default());
        }
        out
    }

    fn is_empty(&self) -> bool {
        self.store.as_ref().map_or(true, RowStore::is_empty)
    }
}

impl Aggregator for PerformanceWindow {
    type Input = WindowInput;
    type Output = WindowSeries;

    fn accumulate(&mut self, input: WindowInput) -> Result<()> {
        let is_trade = input
            .is_trade
            .ok_or_else(|| EngineError::missing("trade indicator"))?;
        let timestamp = input.timestamp.ok_or_else(|| EngineError::missing("timestamp"))?;

        let fresh = match self.store {
            Some(_) => None,
            None => Some(self.prepare(&input, timestamp)?),
        };

        let price = match (is_trade, input.price) {
            (true, Some(price)) => price,
            (true, None) => {
                warn!(timestamp, "trade row without a price skipped");
                if let Some((header, store)) = fresh {
                    self.commit(header, store);
                }
                return Ok(());
            }
            // signals take the price context of the latest trade
            (false, _) => fresh
                .as_ref()
                .map_or(self.header.last_trade_price, |(header, _)| header.last_trade_price),
        };

        // a rejected row must leave a fresh window untouched
        let row = self.encode_row(is_trade, timestamp, price, &input.extras)?;
        if let Some((header, store)) = fresh {
            self.commit(header, store);
        }
        let store = self
            .store
            .as_mut()
            .ok_or_else(|| EngineError::validation("performance window has no row store"))?;
        store.append(&row)?;

        if is_trade {
            self.header.last_trade_price = price;
        } else {
            self.header.live_signals += 1;
            self.header.last_signal_time = timestamp;
        }
        self.header.calls += 1;
        Ok(())
    }

    /// The window is inherently sequential: the left state is kept unless it
    /// holds nothing.
    fn combine(self, other: Self) -> Self {
        if self.is_empty() {
            other
        } else {
            self
        }
    }

    fn finalize(&mut self) -> Result<Option<WindowSeries>> {
        if !self.sweep()? {
            return Ok(None);
        }
        Ok(Some(self.series()))
    }
}

/// Performance window whose output is produced by an injected reducer over
/// the raw rows instead of the three parallel sequences
#[derive(Debug, Clone)]
pub struct DelegatingWindow<R> {
    window: PerformanceWindow,
    reducer: R,
}

impl<R: WindowReducer> DelegatingWindow<R> {
    pub fn new(window: PerformanceWindow, reducer: R) -> Self {
        Self { window, reducer }
    }

    pub fn window(&self) -> &PerformanceWindow {
        &self.window
    }
}

impl<R: WindowReducer> Aggregator for DelegatingWindow<R> {
    type Input = WindowInput;
    type Output = R::Output;

    fn accumulate(&mut self, input: WindowInput) -> Result<()> {
        self.window.accumulate(input)
    }

    fn combine(self, other: Self) -> Self {
        if self.window.is_empty() {
            other
        } else {
            self
        }
    }

    fn finalize(&mut self) -> Result<Option<R::Output>> {
        if !self.window.sweep()? {
            return Ok(None);
        }
        Ok(Some(
            self.reducer
                .reduce(self.window.live_bytes(), self.window.header.row_size),
        ))
    }
}
