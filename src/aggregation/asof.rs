//! As-of join helper: carries the most recent quote forward to later rows

use super::Aggregator;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AsOfMode {
    /// Each row carries an explicit quote flag
    #[default]
    Typed,
    /// Rows with both a price and an id are quotes, everything else is a query
    SeparateRows,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AsOfInput {
    pub price: Option<f64>,
    pub id: Option<i64>,
    pub is_quote: Option<bool>,
}

impl AsOfInput {
    pub fn quote(price: f64, id: i64) -> Self {
        Self {
            price: Some(price),
            id: Some(id),
            is_quote: Some(true),
        }
    }

    pub fn query() -> Self {
        Self {
            is_quote: Some(false),
            ..Default::default()
        }
    }
}

/// The quote in effect at a query row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsOfMatch {
    pub value: f64,
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AsOf {
    mode: AsOfMode,
    value: f64,
    id: i64,
    is_quote: bool,
    quoted: bool,
    calls: u64,
}

impl AsOf {
    pub fn new(mode: AsOfMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn separate_rows() -> Self {
        Self::new(AsOfMode::SeparateRows)
    }

    /// Whether the latest row was a quote
    pub fn is_quote(&self) -> bool {
        self.is_quote
    }

    fn remember(&mut self, value: f64, id: Option<i64>) {
        self.value = value;
        self.id = id.unwrap_or(0);
        self.is_quote = true;
        self.quoted = true;
    }
}

impl Aggregator for AsOf {
    type Input = AsOfInput;
    type Output = AsOfMatch;

    fn accumulate(&mut self, input: AsOfInput) -> Result<()> {
        self.calls += 1;
        match self.mode {
            AsOfMode::Typed => match (input.is_quote, input.price) {
                (Some(true), Some(price)) => self.remember(price, input.id),
                (Some(true), None) => warn!(id = ?input.id, "quote row without a price ignored"),
                (Some(false), _) => self.is_quote = false,
                (None, _) => {}
            },
            AsOfMode::SeparateRows => match (input.price, input.id) {
                (Some(price), Some(id)) => self.remember(price, Some(id)),
                _ => self.is_quote = false,
            },
        }
        Ok(())
    }

    /// A quote on the right replaces everything; otherwise the left quote is
    /// kept and only the right's row kind is taken.
    fn combine(self, other: Self) -> Self {
        if other.calls == 0 {
            return self;
        }
        if self.calls == 0 || other.is_quote {
            return other;
        }
        Self {
            is_quote: other.is_quote,
            calls: self.calls + other.calls,
            ..self
        }
    }

    fn finalize(&mut self) -> Result<Option<AsOfMatch>> {
        if self.is_quote || !self.quoted {
            return Ok(None);
        }
        Ok(Some(AsOfMatch {
            value: self.value,
            id: self.id,
        }))
    }
}
