//! Rolling statistics and cross detection shared by the indicator signals
//!
//! Every function returns one value per input position. Positions where the
//! statistic is undefined (not enough history) are `None`, never NaN.

use crate::{BarSeries, TriggerDates};

// ============================================================
// ROLLING STATISTICS
// ============================================================

/// Trailing arithmetic mean over `window` values.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            Some(slice.iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Trailing sample standard deviation (n - 1 denominator) over `window` values.
///
/// Undefined for windows shorter than two values.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let ss: f64 = slice.iter().map(|v| (v - mean).powi(2)).sum();
            Some((ss / (window - 1) as f64).sqrt())
        })
        .collect()
}

/// Recursive exponential average `y[i] = alpha * x[i] + (1 - alpha) * y[i-1]`,
/// seeded with `y[0] = x[0]`.
pub fn ema(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            Some(p) => alpha * v + (1.0 - alpha) * p,
            None => v,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

// ============================================================
// CROSSES
// ============================================================

/// Direction in which a fast line crosses a slow line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cross {
    /// `fast > slow` now, `fast <= slow` on the previous bar
    Above,
    /// `fast < slow` now, `fast >= slow` on the previous bar
    Below,
}

/// Positions where `fast` crosses `slow`. Both lines must be defined on the
/// bar and the one before it, so position 0 never qualifies.
pub fn crossings(fast: &[Option<f64>], slow: &[Option<f64>], cross: Cross) -> Vec<usize> {
    let n = fast.len().min(slow.len());
    (1..n)
        .filter(|&i| {
            let (Some(f0), Some(s0), Some(f1), Some(s1)) =
                (fast[i - 1], slow[i - 1], fast[i], slow[i])
            else {
                return false;
            };
            match cross {
                Cross::Above => f1 > s1 && f0 <= s0,
                Cross::Below => f1 < s1 && f0 >= s0,
            }
        })
        .collect()
}

/// Dates of the bars at `positions`.
pub fn dates_at(series: &BarSeries, positions: impl IntoIterator<Item = usize>) -> TriggerDates {
    positions
        .into_iter()
        .filter_map(|i| series.get(i).map(|b| b.date))
        .collect()
}
