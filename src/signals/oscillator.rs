//! RSI overbought/oversold signals

use std::collections::HashMap;

use super::helpers::{dates_at, ema};
use crate::{
    params::{get_value, ParamMeta, ParameterizedSignal},
    series::Field,
    Result, ScreenError, SeriesContext, SignalDetector, SignalId, TriggerDates,
};

impl_with_defaults!(RsiOverboughtSignal, RsiOversoldSignal);

/// Smoothing constant of the RSI averages (Wilder, `alpha = 1 / 14`).
pub const RSI_PERIOD: usize = 14;

/// Relative strength index per bar.
///
/// Gains and losses of consecutive closes are smoothed recursively with
/// `alpha = 1 / RSI_PERIOD`, both starting from zero on the first bar. A zero
/// average loss yields 100. The first bar has no prior close and is `None`.
pub fn rsi(closes: &[f64]) -> Vec<Option<f64>> {
    if closes.is_empty() {
        return Vec::new();
    }
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    gains.push(0.0);
    losses.push(0.0);
    for w in closes.windows(2) {
        let delta = w[1] - w[0];
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    let alpha = 1.0 / RSI_PERIOD as f64;
    let avg_gain = ema(&gains, alpha);
    let avg_loss = ema(&losses, alpha);

    let mut out: Vec<Option<f64>> = avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(&g, &l)| {
            if l == 0.0 {
                Some(100.0)
            } else {
                Some(100.0 - 100.0 / (1.0 + g / l))
            }
        })
        .collect();
    out[0] = None;
    out
}

fn rsi_dates(ctx: &SeriesContext<'_>, fires: impl Fn(f64) -> bool) -> TriggerDates {
    let series = ctx.series();
    let values = rsi(&series.values(Field::Close));
    dates_at(
        series,
        values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.filter(|&r| fires(r)).map(|_| i)),
    )
}

fn check_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&threshold) {
        return Err(ScreenError::OutOfRange {
            field: "threshold",
            value: threshold,
            min: 0.0,
            max: 100.0,
        });
    }
    Ok(())
}

// ============================================================
// RSI SIGNALS
// ============================================================

/// RSI strictly above `threshold`
#[derive(Debug, Clone, PartialEq)]
pub struct RsiOverboughtSignal {
    pub threshold: f64,
}

impl Default for RsiOverboughtSignal {
    fn default() -> Self {
        Self { threshold: 70.0 }
    }
}

/// RSI strictly below `threshold`
#[derive(Debug, Clone, PartialEq)]
pub struct RsiOversoldSignal {
    pub threshold: f64,
}

impl Default for RsiOversoldSignal {
    fn default() -> Self {
        Self { threshold: 30.0 }
    }
}

impl SignalDetector for RsiOverboughtSignal {
    fn id(&self) -> SignalId {
        SignalId("rsi_overbought")
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        let threshold = self.threshold;
        rsi_dates(ctx, |r| r > threshold)
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("threshold", self.threshold)]
    }

    fn validate_config(&self) -> Result<()> {
        check_threshold(self.threshold)
    }
}

impl SignalDetector for RsiOversoldSignal {
    fn id(&self) -> SignalId {
        SignalId("rsi_oversold")
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        let threshold = self.threshold;
        rsi_dates(ctx, |r| r < threshold)
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("threshold", self.threshold)]
    }

    fn validate_config(&self) -> Result<()> {
        check_threshold(self.threshold)
    }
}

// ============================================================
// PARAMETERIZED SIGNAL IMPLEMENTATIONS
// ============================================================

static RSI_OVERBOUGHT_PARAMS: &[ParamMeta] = &[ParamMeta::threshold(
    "threshold",
    70.0,
    (0.0, 100.0, 1.0),
    "RSI level to exceed",
)];

static RSI_OVERSOLD_PARAMS: &[ParamMeta] = &[ParamMeta::threshold(
    "threshold",
    30.0,
    (0.0, 100.0, 1.0),
    "RSI level to fall under",
)];

impl ParameterizedSignal for RsiOverboughtSignal {
    fn param_meta() -> &'static [ParamMeta] {
        RSI_OVERBOUGHT_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            threshold: get_value(params, "threshold", 70.0)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "rsi_overbought"
    }
}

impl ParameterizedSignal for RsiOversoldSignal {
    fn param_meta() -> &'static [ParamMeta] {
        RSI_OVERSOLD_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            threshold: get_value(params, "threshold", 30.0)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "rsi_oversold"
    }
}
