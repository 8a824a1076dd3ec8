//! Error types for the aggregation engine
//!
//! Every failure aborts the current call for one logical group. Degenerate
//! arithmetic (zero spans, zero weights, zero variance) is not an error and is
//! reported by the operators as an absent result instead.

use crate::types::Interval;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A required argument was missing or malformed
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// An interval decomposes to an unusable length
    #[error("invalid interval {interval:?}: {reason}")]
    InvalidInterval { interval: Interval, reason: String },

    /// A trailing column cannot be stored as a fixed-size value
    #[error("column {column} of type {type_name} is not fixed width; pass by value types only, not arrays or text")]
    TypeConstraint { column: usize, type_name: String },

    /// Growing a row store failed; the previous buffer is untouched
    #[error("failed to reserve {requested_rows} rows of {row_size} bytes")]
    Allocation { requested_rows: usize, row_size: usize },
}

impl EngineError {
    pub fn validation(reason: impl Into<String>) -> Self {
        EngineError::Validation { reason: reason.into() }
    }

    pub fn missing(argument: &str) -> Self {
        EngineError::Validation {
            reason: format!("{argument} cannot be null"),
        }
    }

    pub fn invalid_interval(interval: Interval, reason: impl Into<String>) -> Self {
        EngineError::InvalidInterval {
            interval,
            reason: reason.into(),
        }
    }

    /// True for the failures raised while checking call arguments
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::Validation { .. } | EngineError::InvalidInterval { .. }
        )
    }
}
