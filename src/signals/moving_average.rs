//! Moving-average cross signals: SMA golden/death cross and MACD crosses

use std::collections::HashMap;

use super::helpers::{crossings, dates_at, ema, Cross};
use crate::{
    params::{get_period, ParamMeta, ParameterizedSignal},
    series::Field,
    Period, Result, SeriesContext, SignalDetector, SignalId, TriggerDates,
};

impl_with_defaults!(
    GoldenCrossSignal,
    DeathCrossSignal,
    MacdBullishSignal,
    MacdBearishSignal,
);

// ============================================================
// SMA CROSSES
// ============================================================

/// Short SMA crosses above the long SMA
#[derive(Debug, Clone, PartialEq)]
pub struct GoldenCrossSignal {
    pub short_sma: Period,
    pub long_sma: Period,
}

impl Default for GoldenCrossSignal {
    fn default() -> Self {
        Self {
            short_sma: Period::new_const(50),
            long_sma: Period::new_const(200),
        }
    }
}

/// Short SMA crosses below the long SMA
#[derive(Debug, Clone, PartialEq)]
pub struct DeathCrossSignal {
    pub short_sma: Period,
    pub long_sma: Period,
}

impl Default for DeathCrossSignal {
    fn default() -> Self {
        Self {
            short_sma: Period::new_const(50),
            long_sma: Period::new_const(200),
        }
    }
}

fn sma_cross(ctx: &mut SeriesContext<'_>, short: Period, long: Period, cross: Cross) -> TriggerDates {
    let fast = ctx.sma(Field::Close, short.get());
    let slow = ctx.sma(Field::Close, long.get());
    dates_at(ctx.series(), crossings(&fast, &slow, cross))
}

impl SignalDetector for GoldenCrossSignal {
    fn id(&self) -> SignalId {
        SignalId("golden_cross_sma")
    }

    fn min_bars(&self) -> usize {
        self.short_sma.get().max(self.long_sma.get()) + 1
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        sma_cross(ctx, self.short_sma, self.long_sma, Cross::Above)
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("short_sma", self.short_sma.get() as f64),
            ("long_sma", self.long_sma.get() as f64),
        ]
    }
}

impl SignalDetector for DeathCrossSignal {
    fn id(&self) -> SignalId {
        SignalId("death_cross_sma")
    }

    fn min_bars(&self) -> usize {
        self.short_sma.get().max(self.long_sma.get()) + 1
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        sma_cross(ctx, self.short_sma, self.long_sma, Cross::Below)
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("short_sma", self.short_sma.get() as f64),
            ("long_sma", self.long_sma.get() as f64),
        ]
    }
}

// ============================================================
// MACD CROSSES
// ============================================================

/// MACD line (short EMA - long EMA) crosses above its signal line
#[derive(Debug, Clone, PartialEq)]
pub struct MacdBullishSignal {
    pub short_ema: Period,
    pub long_ema: Period,
    pub signal_window: Period,
}

impl Default for MacdBullishSignal {
    fn default() -> Self {
        Self {
            short_ema: Period::new_const(12),
            long_ema: Period::new_const(26),
            signal_window: Period::new_const(9),
        }
    }
}

/// MACD line crosses below its signal line
#[derive(Debug, Clone, PartialEq)]
pub struct MacdBearishSignal {
    pub short_ema: Period,
    pub long_ema: Period,
    pub signal_window: Period,
}

impl Default for MacdBearishSignal {
    fn default() -> Self {
        Self {
            short_ema: Period::new_const(12),
            long_ema: Period::new_const(26),
            signal_window: Period::new_const(9),
        }
    }
}

/// MACD and signal lines. Both are defined from the first bar since every
/// EMA is seeded with the first close.
fn macd_lines(
    ctx: &mut SeriesContext<'_>,
    short: Period,
    long: Period,
    signal: Period,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let fast = ctx.ema(Field::Close, short.get());
    let slow = ctx.ema(Field::Close, long.get());
    let macd: Vec<f64> = fast
        .iter()
        .zip(slow.iter())
        .map(|(f, s)| f.unwrap_or(0.0) - s.unwrap_or(0.0))
        .collect();
    let alpha = 2.0 / (signal.get() as f64 + 1.0);
    let signal_line = ema(&macd, alpha).into_iter().map(Some).collect();
    (macd.into_iter().map(Some).collect(), signal_line)
}

impl SignalDetector for MacdBullishSignal {
    fn id(&self) -> SignalId {
        SignalId("macd_bullish")
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        let (macd, signal) = macd_lines(ctx, self.short_ema, self.long_ema, self.signal_window);
        dates_at(ctx.series(), crossings(&macd, &signal, Cross::Above))
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("short_ema", self.short_ema.get() as f64),
            ("long_ema", self.long_ema.get() as f64),
            ("signal_window", self.signal_window.get() as f64),
        ]
    }
}

impl SignalDetector for MacdBearishSignal {
    fn id(&self) -> SignalId {
        SignalId("macd_bearish")
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        let (macd, signal) = macd_lines(ctx, self.short_ema, self.long_ema, self.signal_window);
        dates_at(ctx.series(), crossings(&macd, &signal, Cross::Below))
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("short_ema", self.short_ema.get() as f64),
            ("long_ema", self.long_ema.get() as f64),
            ("signal_window", self.signal_window.get() as f64),
        ]
    }
}

// ============================================================
// PARAMETERIZED SIGNAL IMPLEMENTATIONS
// ============================================================

static SMA_CROSS_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("short_sma", 50.0, (1.0, 500.0, 1.0), "Short SMA window"),
    ParamMeta::period("long_sma", 200.0, (1.0, 500.0, 1.0), "Long SMA window"),
];

static MACD_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("short_ema", 12.0, (1.0, 200.0, 1.0), "Fast EMA span"),
    ParamMeta::period("long_ema", 26.0, (1.0, 400.0, 1.0), "Slow EMA span"),
    ParamMeta::period("signal_window", 9.0, (1.0, 100.0, 1.0), "Signal line EMA span"),
];

impl ParameterizedSignal for GoldenCrossSignal {
    fn param_meta() -> &'static [ParamMeta] {
        SMA_CROSS_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            short_sma: get_period(params, "short_sma", 50)?,
            long_sma: get_period(params, "long_sma", 200)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "golden_cross_sma"
    }
}

impl ParameterizedSignal for DeathCrossSignal {
    fn param_meta() -> &'static [ParamMeta] {
        SMA_CROSS_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            short_sma: get_period(params, "short_sma", 50)?,
            long_sma: get_period(params, "long_sma", 200)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "death_cross_sma"
    }
}

impl ParameterizedSignal for MacdBullishSignal {
    fn param_meta() -> &'static [ParamMeta] {
        MACD_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            short_ema: get_period(params, "short_ema", 12)?,
            long_ema: get_period(params, "long_ema", 26)?,
            signal_window: get_period(params, "signal_window", 9)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "macd_bullish"
    }
}

impl ParameterizedSignal for MacdBearishSignal {
    fn param_meta() -> &'static [ParamMeta] {
        MACD_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            short_ema: get_period(params, "short_ema", 12)?,
            long_ema: get_period(params, "long_ema", 26)?,
            signal_window: get_period(params, "signal_window", 9)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "macd_bearish"
    }
}
