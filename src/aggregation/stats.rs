//! Single-pass reductions over finalized sequences
//!
//! Degenerate inputs (no values, zero total weight, zero variance) give
//! `None` rather than a non-finite number.

use crate::error::{EngineError, Result};

/// Weighted average with triangular weights `1..=n`, newest value heaviest
pub fn triangular_weighted_average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let (sum, weight) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sum, weight), (i, v)| {
            let w = (i + 1) as f64;
            (sum + w * v, weight + w)
        });
    Some(sum / weight)
}

pub fn weighted_average(values: &[f64], weights: &[f64]) -> Result<Option<f64>> {
    if values.len() != weights.len() {
        return Err(EngineError::validation(format!(
            "size of window and size of weight vector must be the same ({} vs {})",
            values.len(),
            weights.len()
        )));
    }
    let (sum, weight) = values
        .iter()
        .zip(weights)
        .fold((0.0, 0.0), |(sum, weight), (v, w)| (sum + v * w, weight + w));
    if weight == 0.0 {
        return Ok(None);
    }
    Ok(Some(sum / weight))
}

/// Exponentially smoothed last value: `r_i = alpha*v_i + (1-alpha)*r_{i-1}`
pub fn exponential_average(values: &[f64], alpha: f64) -> f64 {
    let Some((&first, rest)) = values.split_first() else {
        return 0.0;
    };
    rest.iter()
        .fold(first, |acc, v| alpha * v + (1.0 - alpha) * acc)
}

/// Stretch `values` onto `len` points by linear interpolation over the index
fn stretch(values: &[f64], len: usize) -> Vec<f64> {
    if len <= 1 || values.len() == len {
        return values.to_vec();
    }
    let ratio = (values.len() - 1) as f64 / (len - 1) as f64;
    (0..len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let lo = pos.floor();
            let hi = pos.ceil().min((values.len() - 1) as f64);
            if lo == hi {
                values[hi as usize]
            } else {
                values[lo as usize] * (hi - pos) + values[hi as usize] * (pos - lo)
            }
        })
        .collect()
}

/// Pearson correlation; the shorter series is first stretched onto the
/// longer one's length
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let len = a.len().max(b.len());
    let (a, b) = (stretch(a, len), stretch(b, len));

    let mean_a = a.iter().sum::<f64>() / len as f64;
    let mean_b = b.iter().sum::<f64>() / len as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(&b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}
