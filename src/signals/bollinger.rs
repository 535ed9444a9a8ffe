//! Bollinger band signals
//!
//! Bands are `middle ± num_std_dev * σ`, where the middle band is the rolling
//! mean of closes and σ their rolling sample standard deviation. Width is
//! `(upper - lower) / middle`.

use std::collections::HashMap;

use super::helpers::dates_at;
use crate::{
    params::{get_period, get_value, ParamMeta, ParameterizedSignal},
    series::Field,
    Period, Result, SeriesContext, SignalDetector, SignalId, TriggerDates, OHLCV,
};

impl_with_defaults!(
    BollingerSqueezeSignal,
    BollingerExpansionSignal,
    BollingerBreakoutSignal,
    BollingerPullbackSignal,
);

/// Band width at or below this fraction of the middle band is a squeeze.
pub const SQUEEZE_MAX_WIDTH: f64 = 0.05;
/// Band width at or above this fraction of the middle band is an expansion.
pub const EXPANSION_MIN_WIDTH: f64 = 0.10;

// ============================================================
// BANDS
// ============================================================

/// Band values at one bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

impl Band {
    /// `None` when the middle band is zero.
    #[inline]
    pub fn width(&self) -> Option<f64> {
        (self.middle != 0.0).then(|| (self.upper - self.lower) / self.middle)
    }
}

/// Band values per bar; `None` until `window` closes are available.
pub fn bands(ctx: &mut SeriesContext<'_>, window: Period, num_std_dev: f64) -> Vec<Option<Band>> {
    let middle = ctx.sma(Field::Close, window.get());
    let sigma = ctx.std_dev(Field::Close, window.get());
    middle
        .iter()
        .zip(sigma.iter())
        .map(|(m, s)| {
            let (m, s) = ((*m)?, (*s)?);
            Some(Band {
                middle: m,
                upper: m + num_std_dev * s,
                lower: m - num_std_dev * s,
            })
        })
        .collect()
}

fn band_dates(
    ctx: &mut SeriesContext<'_>,
    window: Period,
    num_std_dev: f64,
    fires: impl Fn(&Band, f64) -> bool,
) -> TriggerDates {
    let bands = bands(ctx, window, num_std_dev);
    let series = ctx.series();
    dates_at(
        series,
        series
            .bars()
            .iter()
            .zip(bands.iter())
            .enumerate()
            .filter_map(|(i, (bar, band))| {
                let band = band.as_ref()?;
                fires(band, bar.close()).then_some(i)
            }),
    )
}

macro_rules! bollinger_signal {
    ($(#[$doc:meta])* $name:ident, $id:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            pub window: Period,
            pub num_std_dev: f64,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    window: Period::new_const(20),
                    num_std_dev: 2.0,
                }
            }
        }

        impl ParameterizedSignal for $name {
            fn param_meta() -> &'static [ParamMeta] {
                BAND_PARAMS
            }

            fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
                Ok(Self {
                    window: get_period(params, "window", 20)?,
                    num_std_dev: get_value(params, "num_std_dev", 2.0)?,
                })
            }

            fn signal_id_str() -> &'static str {
                $id
            }
        }
    };
}

bollinger_signal!(
    /// Band width at or below 5% of the middle band
    BollingerSqueezeSignal,
    "bollinger_squeeze"
);
bollinger_signal!(
    /// Band width at or above 10% of the middle band
    BollingerExpansionSignal,
    "bollinger_expansion"
);
bollinger_signal!(
    /// Close strictly above the upper band
    BollingerBreakoutSignal,
    "bollinger_breakout"
);
bollinger_signal!(
    /// Close strictly below the lower band
    BollingerPullbackSignal,
    "bollinger_pullback"
);

static BAND_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("window", 20.0, (2.0, 500.0, 1.0), "Rolling window"),
    ParamMeta::multiplier("num_std_dev", 2.0, (0.0, 10.0, 0.5), "Band distance in standard deviations"),
];

// ============================================================
// SIGNAL DETECTOR IMPLEMENTATIONS
// ============================================================

impl SignalDetector for BollingerSqueezeSignal {
    fn id(&self) -> SignalId {
        SignalId("bollinger_squeeze")
    }

    fn min_bars(&self) -> usize {
        self.window.get()
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        band_dates(ctx, self.window, self.num_std_dev, |band, _| {
            band.width().is_some_and(|w| w <= SQUEEZE_MAX_WIDTH)
        })
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("window", self.window.get() as f64), ("num_std_dev", self.num_std_dev)]
    }
}

impl SignalDetector for BollingerExpansionSignal {
    fn id(&self) -> SignalId {
        SignalId("bollinger_expansion")
    }

    fn min_bars(&self) -> usize {
        self.window.get()
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        band_dates(ctx, self.window, self.num_std_dev, |band, _| {
            band.width().is_some_and(|w| w >= EXPANSION_MIN_WIDTH)
        })
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("window", self.window.get() as f64), ("num_std_dev", self.num_std_dev)]
    }
}

impl SignalDetector for BollingerBreakoutSignal {
    fn id(&self) -> SignalId {
        SignalId("bollinger_breakout")
    }

    fn min_bars(&self) -> usize {
        self.window.get()
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        band_dates(ctx, self.window, self.num_std_dev, |band, close| close > band.upper)
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("window", self.window.get() as f64), ("num_std_dev", self.num_std_dev)]
    }
}

impl SignalDetector for BollingerPullbackSignal {
    fn id(&self) -> SignalId {
        SignalId("bollinger_pullback")
    }

    fn min_bars(&self) -> usize {
        self.window.get()
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        band_dates(ctx, self.window, self.num_std_dev, |band, close| close < band.lower)
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("window", self.window.get() as f64), ("num_std_dev", self.num_std_dev)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bar, BarSeries};
    use chrono::{Duration, NaiveDate};

    fn series_from_closes(closes: &[f64]) -> BarSeries {
        let start = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();
        BarSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| Bar::new(start + Duration::days(i as i64), c, c + 0.5, c - 0.5, c, 1e5))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_constant_close_is_squeeze_only() {
        let series = series_from_closes(&[50.0; 30]);
        let mut ctx = SeriesContext::new(&series);

        // zero width satisfies the squeeze bound from the first full window
        let squeeze = BollingerSqueezeSignal::with_defaults().detect(&mut ctx);
        assert_eq!(squeeze.len(), 11);
        assert_eq!(squeeze.iter().next(), Some(&series.bars()[19].date));

        assert!(BollingerExpansionSignal::with_defaults().detect(&mut ctx).is_empty());
        assert!(BollingerBreakoutSignal::with_defaults().detect(&mut ctx).is_empty());
        assert!(BollingerPullbackSignal::with_defaults().detect(&mut ctx).is_empty());
    }

    #[test]
    fn test_breakout_on_jump() {
        let mut closes = vec![50.0; 25];
        closes.push(60.0);
        let series = series_from_closes(&closes);
        let mut ctx = SeriesContext::new(&series);

        let breakout = BollingerBreakoutSignal::with_defaults().detect(&mut ctx);
        assert_eq!(breakout.into_iter().collect::<Vec<_>>(), vec![series.bars()[25].date]);
        let expansion = BollingerExpansionSignal::with_defaults().detect(&mut ctx);
        assert!(expansion.contains(&series.bars()[25].date));
    }

    #[test]
    fn test_pullback_on_drop() {
        let mut closes = vec![50.0; 25];
        closes.push(40.0);
        let series = series_from_closes(&closes);
        let mut ctx = SeriesContext::new(&series);

        let pullback = BollingerPullbackSignal::with_defaults().detect(&mut ctx);
        assert_eq!(pullback.len(), 1);
    }

    #[test]
    fn test_short_history_is_silent() {
        let series = series_from_closes(&[50.0; 10]);
        let mut ctx = SeriesContext::new(&series);
        assert!(BollingerSqueezeSignal::with_defaults().detect(&mut ctx).is_empty());
    }

    #[test]
    fn test_zero_middle_band_has_no_width() {
        let band = Band { middle: 0.0, upper: 1.0, lower: -1.0 };
        assert_eq!(band.width(), None);
    }
}
