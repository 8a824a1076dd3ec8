//! Fold-style operators over ordered rows
//!
//! Every operator follows the same three-step contract: `accumulate` once per
//! row in timestamp order, optionally `combine` two partial states, then
//! `finalize` to project the state into output.
//!
//! - [`Resampler`]: uniform and gap-filled linear resampling
//! - [`PerformanceWindow`]: signal-anchored retention window over trade rows
//! - [`AsOf`]: carries the latest quote forward to non-quote rows
//! - [`stats`]: single-pass reductions over finalized sequences

pub mod asof;
pub mod performance;
pub mod resample;
pub mod stats;
pub mod summary;

pub use asof::{AsOf, AsOfInput, AsOfMatch, AsOfMode};
pub use performance::{DelegatingWindow, PerformanceWindow, WindowInput, WindowReducer, WindowSeries};
pub use resample::{Brackets, Fill, ResampleInput, ResampleMode, ResampleState, Resampler};
pub use summary::{PerformanceSummary, SummaryReducer};

use crate::error::Result;

pub trait Aggregator {
    type Input;
    type Output;

    /// Fold one row into the state
    fn accumulate(&mut self, input: Self::Input) -> Result<()>;

    fn accumulate_batch<I>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator<Item = Self::Input>,
    {
        for input in inputs {
            self.accumulate(input)?;
        }
        Ok(())
    }

    /// Merge two partial states.
    ///
    /// None of the operators here are associative; each documents which side
    /// it keeps.
    fn combine(self, other: Self) -> Self
    where
        Self: Sized;

    /// Project the state into output, `None` when there is nothing to emit
    fn finalize(&mut self) -> Result<Option<Self::Output>>;
}

/// Feed every input to one aggregator and finalize once
pub fn fold<A, I>(mut aggregator: A, inputs: I) -> Result<Option<A::Output>>
where
    A: Aggregator,
    I: IntoIterator<Item = A::Input>,
{
    aggregator.accumulate_batch(inputs)?;
    aggregator.finalize()
}

/// Finalize after every accumulate and keep each non-empty output, the way a
/// window function evaluates a running frame
pub fn scan<A, I>(aggregator: &mut A, inputs: I) -> Result<Vec<A::Output>>
where
    A: Aggregator,
    I: IntoIterator<Item = A::Input>,
{
    let mut outputs = Vec::new();
    for input in inputs {
        aggregator.accumulate(input)?;
        if let Some(output) = aggregator.finalize()? {
            outputs.push(output);
        }
    }
    Ok(outputs)
}
