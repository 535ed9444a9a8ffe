//! # apexscan - technical-signal and chart-formation screener
//!
//! Screens daily price/volume series for classic indicator triggers and
//! multi-bar chart formations, intersects the trigger dates of every enabled
//! signal, and reports how often those dates historically preceded a rise.
//!
//! ## Quick Start
//!
//! ```rust
//! use apexscan::prelude::*;
//! use chrono::NaiveDate;
//!
//! let settings = Settings::from_json(r#"{
//!     "indicator_settings": {
//!         "golden_cross_sma": { "is_enabled": true, "short_sma": 5, "long_sma": 20 }
//!     },
//!     "recency": 5,
//!     "x": 10
//! }"#).unwrap();
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let bars: Vec<Bar> = (0..60)
//!     .map(|i| {
//!         let close = 50.0 + (i as f64 / 4.0).sin() * 5.0;
//!         Bar::new(start + chrono::Duration::days(i), close, close + 1.0, close - 1.0, close, 1e6)
//!     })
//!     .collect();
//! let series = BarSeries::new(bars).unwrap();
//!
//! let screener = Screener::new(settings).unwrap();
//! let _result = screener.analyze_stock(&series);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

pub mod cache;
pub mod config;
pub mod params;
pub mod patterns;
pub mod screener;
pub mod series;
pub mod signals;

pub use series::{BarSeries, SeriesContext};

pub mod prelude {
    pub use crate::{
        // Cache
        cache::{CacheKey, SignalCache},
        // Configuration
        config::{IndicatorConfig, Settings},
        // Parameters
        params::{get_period, get_value, ParamMeta, ParamType, ParameterizedSignal},
        // Patterns
        patterns::*,
        // Screening
        screener::{
            analyze_everything, analyze_stock, HorizonStats, HorizonSummary, MarketData,
            ScanError, Screener, ScreeningResult, TickerResult, UniverseReport, UniverseSummary,
        },
        // Series
        series::{aggregate_pairs, Field, OverlayKey},
        // Indicators
        signals::*,
        // Core types
        Bar,
        BarSeries,
        BuiltinSignal,
        Direction,
        Period,
        Result,
        ScreenError,
        SeriesContext,
        SignalDetector,
        SignalId,
        SignalResult,
        TriggerDates,
        OHLCV,
        OHLCVExt,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ScreenError>;

/// Errors raised while configuring a screen or loading a series.
///
/// Detection itself never fails: missing history yields empty trigger sets.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScreenError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    #[error("Unknown parameter `{param}` for signal {signal}")]
    UnknownParameter { signal: String, param: String },

    #[error("Bar dates must be strictly increasing (violated at index {index})")]
    UnorderedDates { index: usize },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },

    #[error("Market data unavailable for {ticker}: {reason}")]
    Data { ticker: String, reason: String },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Window length in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(ScreenError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Body of a flush-down bar must exceed this share of its range.
pub const FLUSH_DOWN_BODY_RATIO: f64 = 0.7;
/// Bullish body share of range that marks a reversal bar.
pub const REVERSAL_BODY_RATIO: f64 = 0.5;
/// Open and close above this fraction of the range also mark a reversal bar.
pub const REVERSAL_TOP_FRACTION: f64 = 0.8;

/// Core OHLCV data trait for one dated bar
pub trait OHLCV {
    fn date(&self) -> NaiveDate;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Strong intrabar selling: `open - close > 0.7 * (high - low)`.
    #[inline]
    fn is_flush_down(&self) -> bool {
        self.open() - self.close() > FLUSH_DOWN_BODY_RATIO * self.range()
    }

    /// Strong intrabar buying: either a bullish body over half the range, or
    /// both open and close sitting in the top fifth of the range.
    #[inline]
    fn is_bullish_reversal(&self) -> bool {
        let range = self.range();
        let top = self.low() + REVERSAL_TOP_FRACTION * range;
        self.close() - self.open() > REVERSAL_BODY_RATIO * range
            || (self.open() > top && self.close() > top)
    }

    /// True when `level` lies inside `[low, high]`.
    #[inline]
    fn straddles(&self, level: f64) -> bool {
        self.low() <= level && level <= self.high()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(ScreenError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(ScreenError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(ScreenError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// One trading day's observation.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

// ============================================================
// SIGNAL IDENTITY
// ============================================================

/// Ordered set of dates on which a signal fired.
pub type TriggerDates = BTreeSet<NaiveDate>;

/// Trigger dates of each evaluated signal.
pub type SignalResult = BTreeMap<SignalId, TriggerDates>;

/// Unique identifier for a signal type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct SignalId(pub &'static str);

impl SignalId {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Returns the direction this signal usually points to, `None` if unknown.
    pub fn typical_direction(&self) -> Option<Direction> {
        match self.0 {
            "golden_cross_sma" | "rsi_oversold" | "macd_bullish" | "bollinger_breakout"
            | "apex_bull_raging" | "apex_bull_appear" | "apex_uptrend" => {
                Some(Direction::Bullish)
            }
            "death_cross_sma" | "rsi_overbought" | "macd_bearish" | "bollinger_pullback"
            | "apex_downtrend" => Some(Direction::Bearish),
            "bollinger_squeeze" | "bollinger_expansion" | "volume_spike" => {
                Some(Direction::Neutral)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Direction/bias of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

// ============================================================
// SIGNAL DETECTOR TRAIT
// ============================================================

/// A signal maps a bar series to the dates on which it fires.
///
/// Implementations read derived values (moving averages, deviations) from the
/// [`SeriesContext`] so that two signals asking for the same overlay share one
/// computation, while the bars themselves are never written to.
pub trait SignalDetector: Send + Sync {
    fn id(&self) -> SignalId;

    /// Bars needed before the signal can fire at all.
    fn min_bars(&self) -> usize;

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates;

    /// Parameter values, in schema order. Part of the cache key.
    fn params(&self) -> Vec<(&'static str, f64)> {
        Vec::new()
    }

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// BUILTIN SIGNALS - generated via macro
// ============================================================

use params::{ParamMeta, ParameterizedSignal};
use patterns::*;
use signals::*;

/// Macro to generate the BuiltinSignal registry without boilerplate
macro_rules! define_builtin_signals {
    (
        $(
            $variant:ident($signal:ty)
        ),* $(,)?
    ) => {
        /// All builtin signals - dispatch via enum, resolved from identifiers
        #[derive(Debug, Clone, PartialEq)]
        pub enum BuiltinSignal {
            $($variant($signal)),*
        }

        impl BuiltinSignal {
            /// Evaluate the signal, short-circuiting when history is too short.
            pub fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
                if ctx.series().len() < self.min_bars() {
                    return TriggerDates::new();
                }
                match self {
                    $(Self::$variant(s) => SignalDetector::detect(s, ctx)),*
                }
            }

            #[inline]
            pub fn id(&self) -> SignalId {
                match self {
                    $(Self::$variant(s) => SignalDetector::id(s)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(s) => SignalDetector::min_bars(s)),*
                }
            }

            pub fn params(&self) -> Vec<(&'static str, f64)> {
                match self {
                    $(Self::$variant(s) => SignalDetector::params(s)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(s) => SignalDetector::validate_config(s)),*
                }
            }

            /// Identifiers of every registered signal.
            pub fn available() -> Vec<&'static str> {
                vec![$(<$signal as ParameterizedSignal>::signal_id_str()),*]
            }

            /// Parameter schema for an identifier.
            pub fn param_meta(id: &str) -> Option<&'static [ParamMeta]> {
                $(
                    if id == <$signal as ParameterizedSignal>::signal_id_str() {
                        return Some(<$signal as ParameterizedSignal>::param_meta());
                    }
                )*
                None
            }

            /// Resolve an identifier and its parameters into a typed signal.
            ///
            /// Unknown identifiers and parameter names are rejected, values are
            /// range-checked against the schema, and missing names take defaults.
            pub fn from_config(id: &str, params: &HashMap<&str, f64>) -> Result<Self> {
                $(
                    if id == <$signal as ParameterizedSignal>::signal_id_str() {
                        let meta = <$signal as ParameterizedSignal>::param_meta();
                        check_params(id, meta, params)?;
                        let signal = <$signal as ParameterizedSignal>::with_params(params)?;
                        SignalDetector::validate_config(&signal)?;
                        return Ok(Self::$variant(signal));
                    }
                )*
                Err(ScreenError::UnknownSignal(id.to_string()))
            }
        }
    };
}

fn check_params(id: &str, meta: &[ParamMeta], params: &HashMap<&str, f64>) -> Result<()> {
    for (&name, &value) in params {
        let schema = meta
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| ScreenError::UnknownParameter {
                signal: id.to_string(),
                param: name.to_string(),
            })?;
        schema.validate(value)?;
    }
    Ok(())
}

define_builtin_signals! {
    // Moving averages
    GoldenCross(GoldenCrossSignal),
    DeathCross(DeathCrossSignal),
    MacdBullish(MacdBullishSignal),
    MacdBearish(MacdBearishSignal),

    // Oscillators
    RsiOverbought(RsiOverboughtSignal),
    RsiOversold(RsiOversoldSignal),

    // Bands
    BollingerSqueeze(BollingerSqueezeSignal),
    BollingerExpansion(BollingerExpansionSignal),
    BollingerBreakout(BollingerBreakoutSignal),
    BollingerPullback(BollingerPullbackSignal),

    // Volume
    VolumeSpike(VolumeSpikeSignal),

    // Formations and multi-stage patterns
    Uptrend(UptrendSignal),
    Downtrend(DowntrendSignal),
    BullRaging(BullRagingSignal),
    BullAppear(BullAppearSignal),
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(200).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let bar = Bar::new(day(1), 100.0, 110.0, 90.0, 105.0, 1000.0);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
        assert!(bar.straddles(90.0));
        assert!(!bar.straddles(110.5));
    }

    #[test]
    fn test_flush_down_bar() {
        // body 15 of range 20 -> 75%
        assert!(Bar::new(day(1), 109.0, 110.0, 90.0, 94.0, 1.0).is_flush_down());
        // body exactly 70% is not enough
        assert!(!Bar::new(day(1), 107.0, 110.0, 90.0, 93.0, 1.0).is_flush_down());
    }

    #[test]
    fn test_bullish_reversal_bar() {
        // bullish body over half the range
        assert!(Bar::new(day(1), 91.0, 110.0, 90.0, 105.0, 1.0).is_bullish_reversal());
        // open and close both in the top fifth
        assert!(Bar::new(day(1), 107.0, 110.0, 90.0, 106.5, 1.0).is_bullish_reversal());
        // small body in the middle
        assert!(!Bar::new(day(1), 99.0, 110.0, 90.0, 101.0, 1.0).is_bullish_reversal());
    }

    #[test]
    fn test_validate_bar() {
        assert!(Bar::new(day(1), 1.0, 2.0, 0.5, 1.5, 1.0).validate().is_ok());
        assert!(Bar::new(day(1), 1.0, 0.5, 2.0, 1.5, 1.0).validate().is_err());
        assert!(Bar::new(day(1), f64::NAN, 2.0, 0.5, 1.5, 1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_registry_resolves_every_identifier() {
        let empty = HashMap::new();
        for id in BuiltinSignal::available() {
            let signal = BuiltinSignal::from_config(id, &empty).unwrap();
            assert_eq!(signal.id().as_str(), id);
            assert!(signal.id().typical_direction().is_some());
        }
    }

    #[test]
    fn test_registry_rejects_unknown_signal() {
        let err = BuiltinSignal::from_config("apex_bear_raging", &HashMap::new()).unwrap_err();
        assert_eq!(err, ScreenError::UnknownSignal("apex_bear_raging".into()));
    }

    #[test]
    fn test_registry_rejects_unknown_parameter() {
        let mut params = HashMap::new();
        params.insert("short_window", 10.0);
        let err = BuiltinSignal::from_config("golden_cross_sma", &params).unwrap_err();
        assert!(matches!(err, ScreenError::UnknownParameter { .. }));
    }

    #[test]
    fn test_registry_applies_parameters() {
        let mut params = HashMap::new();
        params.insert("short_sma", 10.0);
        let signal = BuiltinSignal::from_config("golden_cross_sma", &params).unwrap();
        assert_eq!(signal.params(), vec![("short_sma", 10.0), ("long_sma", 200.0)]);
        assert_eq!(signal.min_bars(), 201);
    }

    #[test]
    fn test_registry_rejects_out_of_range() {
        let mut params = HashMap::new();
        params.insert("threshold", 150.0);
        assert!(BuiltinSignal::from_config("rsi_overbought", &params).is_err());
    }

    #[test]
    fn test_param_meta_lookup() {
        let meta = BuiltinSignal::param_meta("macd_bullish").unwrap();
        let names: Vec<_> = meta.iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["short_ema", "long_ema", "signal_window"]);
        assert!(BuiltinSignal::param_meta("apex_uptrend").unwrap().is_empty());
        assert!(BuiltinSignal::param_meta("nope").is_none());
    }
}
