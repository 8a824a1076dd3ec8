//! Uniform and gap-filled resampling of irregular observations
//!
//! The state keeps the two most recent raw samples (the brackets) and a
//! pending anchor on the step grid. Each accumulate slides the brackets forward
//! by one observation and records how many grid points fell between them;
//! finalize emits exactly those points. Calling finalize after every accumulate
//! therefore yields the complete resampled series, one slice per observation.
//!
//! Times inside the state are fractional seconds; inputs and outputs are
//! microseconds.

use super::Aggregator;
use crate::error::Result;
use crate::types::{micros_to_secs, secs_to_micros, Interval, Observation, ResampledSeries};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleMode {
    /// Points on a fixed grid anchored at the first observation (or start)
    Uniform,
    /// Points every step back from each observation, never past the latest one
    GapFilled,
}

/// How emitted points get their value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fill {
    /// Linear interpolation between the brackets
    Linear,
    /// Hold the earlier bracket's value
    Constant,
}

/// Bracketing samples plus the pending grid position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brackets {
    pub anchor_time: f64,
    pub anchor_value: f64,
    pub earlier_time: f64,
    pub earlier_value: f64,
    pub later_time: f64,
    pub later_value: f64,
    pub step: f64,
    pub step_count: i64,
    pub span: f64,
}

impl Brackets {
    /// Linear interpolation at `at` between the two brackets.
    ///
    /// Coinciding brackets have no slope; the later value is returned as is.
    pub fn interpolate(&self, at: f64) -> f64 {
        if self.span == 0.0 {
            return self.later_value;
        }
        (at - self.earlier_time) / self.span * self.later_value
            + (self.later_time - at) / self.span * self.earlier_value
    }

    /// Flat nine-field layout: anchor, brackets, step, step count, span
    pub fn to_array(&self) -> [f64; 9] {
        [
            self.anchor_time,
            self.anchor_value,
            self.earlier_time,
            self.earlier_value,
            self.later_time,
            self.later_value,
            self.step,
            self.step_count as f64,
            self.span,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ResampleState {
    /// No observation seen yet
    Empty,
    /// One observation seen; both brackets derive from it
    Bootstrapping(Brackets),
    /// Two or more observations seen
    Steady(Brackets),
}

impl ResampleState {
    pub fn brackets(&self) -> Option<&Brackets> {
        match self {
            ResampleState::Empty => None,
            ResampleState::Bootstrapping(b) | ResampleState::Steady(b) => Some(b),
        }
    }

    fn completeness(&self) -> u8 {
        match self {
            ResampleState::Empty => 0,
            ResampleState::Bootstrapping(_) => 1,
            ResampleState::Steady(_) => 2,
        }
    }
}

/// One resampler call: an optional observation and the step interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampleInput {
    pub observation: Option<Observation>,
    pub step: Interval,
}

impl ResampleInput {
    pub fn new(observation: Option<Observation>, step: Interval) -> Self {
        Self { observation, step }
    }

    pub fn at(timestamp: i64, value: f64, step: Interval) -> Self {
        Self::new(Some(Observation::new(timestamp, value)), step)
    }

    /// A call whose observation is null
    pub fn missing(step: Interval) -> Self {
        Self::new(None, step)
    }
}

#[derive(Debug, Clone)]
pub struct Resampler {
    mode: ResampleMode,
    fill: Fill,
    include_original: bool,
    start: Option<f64>,
    state: ResampleState,
}

impl Resampler {
    pub fn new(mode: ResampleMode) -> Self {
        Self {
            mode,
            fill: Fill::Linear,
            include_original: false,
            start: None,
            state: ResampleState::Empty,
        }
    }

    pub fn uniform() -> Self {
        Self::new(ResampleMode::Uniform)
    }

    pub fn gap_filled() -> Self {
        Self::new(ResampleMode::GapFilled)
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = fill;
        self
    }

    /// Prepend the earlier raw sample when the anchor is off the sample's grid
    pub fn with_original(mut self, include_original: bool) -> Self {
        self.include_original = include_original;
        self
    }

    /// Bracket the first observation against an explicit start time (microseconds)
    pub fn starting_at(mut self, start: i64) -> Self {
        self.start = Some(micros_to_secs(start));
        self
    }

    pub fn mode(&self) -> ResampleMode {
        self.mode
    }

    pub fn state(&self) -> &ResampleState {
        &self.state
    }

    /// Advance the state machine by one call
    pub fn observe(&mut self, observation: Option<Observation>, step: Interval) -> Result<()> {
        // validated before anything is touched, even when the observation is null
        let step = step.step_seconds()?;

        self.state = match (self.state, observation) {
            (ResampleState::Empty, None) => ResampleState::Empty,
            (ResampleState::Bootstrapping(mut b), None) => {
                b.step_count = 0;
                ResampleState::Bootstrapping(b)
            }
            (ResampleState::Steady(mut b), None) => {
                b.step_count = 0;
                ResampleState::Steady(b)
            }
            (ResampleState::Empty, Some(obs)) => {
                let b = self.seed(micros_to_secs(obs.timestamp), obs.value, step);
                debug!(mode = ?self.mode, step, steps = b.step_count, "resampler seeded");
                ResampleState::Bootstrapping(b)
            }
            (ResampleState::Bootstrapping(prev) | ResampleState::Steady(prev), Some(obs)) => {
                ResampleState::Steady(self.advance(&prev, micros_to_secs(obs.timestamp), obs.value))
            }
        };
        Ok(())
    }

    fn seed(&self, time: f64, value: f64, step: f64) -> Brackets {
        let earlier_time = self.start.unwrap_or(time);
        let span = time - earlier_time;
        let mut b = Brackets {
            anchor_time: time,
            anchor_value: value,
            earlier_time,
            earlier_value: value,
            later_time: time,
            later_value: value,
            step,
            step_count: 0,
            span,
        };
        match self.mode {
            ResampleMode::Uniform => {
                b.anchor_time = earlier_time;
                b.step_count = (span / step).floor() as i64;
                if b.step_count >= 1 {
                    b.anchor_time += step * b.step_count as f64;
                }
            }
            ResampleMode::GapFilled => {
                b.step_count = if self.start.is_some() {
                    (span / step).ceil() as i64
                } else {
                    1
                };
            }
        }
        b
    }

    fn advance(&self, prev: &Brackets, time: f64, value: f64) -> Brackets {
        let mut b = Brackets {
            anchor_time: prev.anchor_time,
            anchor_value: prev.anchor_value,
            earlier_time: prev.later_time,
            earlier_value: prev.later_value,
            later_time: time,
            later_value: value,
            step: prev.step,
            step_count: 0,
            span: time - prev.later_time,
        };
        match self.mode {
            ResampleMode::Uniform => {
                b.step_count = ((time - prev.anchor_time) / prev.step).floor() as i64;
                if b.step_count >= 1 {
                    b.anchor_time = prev.anchor_time + prev.step * b.step_count as f64;
                    b.anchor_value = b.interpolate(b.anchor_time);
                }
            }
            ResampleMode::GapFilled => {
                b.anchor_time = time;
                b.anchor_value = value;
                b.step_count = (b.span / prev.step).ceil() as i64;
            }
        }
        b
    }

    fn value_at(&self, b: &Brackets, at: f64) -> f64 {
        match self.fill {
            Fill::Linear => b.interpolate(at),
            Fill::Constant => b.earlier_value,
        }
    }

    /// The points due for the most recent call
    pub fn series(&self) -> ResampledSeries {
        let mut out = ResampledSeries::default();
        let Some(b) = self.state.brackets() else {
            return out;
        };
        let count = b.step_count.max(0);

        let offset = b.anchor_time - b.later_time;
        if self.include_original && count > 0 && offset != offset.trunc() {
            out.push(secs_to_micros(b.earlier_time), b.earlier_value);
        }

        match self.mode {
            ResampleMode::Uniform => {
                for k in (0..count).rev() {
                    let at = b.anchor_time - k as f64 * b.step;
                    out.push(secs_to_micros(at), self.value_at(b, at));
                }
            }
            ResampleMode::GapFilled => {
                if count >= 1 && b.span == 0.0 {
                    out.push(secs_to_micros(b.later_time), b.later_value);
                } else {
                    for k in (0..count).rev() {
                        let at = b.later_time - k as f64 * b.step;
                        out.push(secs_to_micros(at), self.value_at(b, at));
                    }
                }
            }
        }
        out
    }
}

impl Aggregator for Resampler {
    type Input = ResampleInput;
    type Output = ResampledSeries;

    fn accumulate(&mut self, input: ResampleInput) -> Result<()> {
        self.observe(input.observation, input.step)
    }

    /// Keeps the more complete state; on a tie the one holding the more recent
    /// observation wins. This is a tie-break, not an associative merge.
    fn combine(self, other: Self) -> Self {
        let take_other = match other.state.completeness().cmp(&self.state.completeness()) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => match (self.state.brackets(), other.state.brackets()) {
                (Some(mine), Some(theirs)) => theirs.later_time > mine.later_time,
                _ => false,
            },
        };
        if take_other {
            other
        } else {
            self
        }
    }

    fn finalize(&mut self) -> Result<Option<ResampledSeries>> {
        let series = self.series();
        Ok(if series.is_empty() { None } else { Some(series) })
    }
}
