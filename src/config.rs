//! Screening settings
//!
//! Loaded from JSON in the dashboard's shape:
//!
//! ```json
//! {
//!   "tickers": ["AAPL", "MSFT"],
//!   "indicator_settings": {
//!     "golden_cross_sma": { "is_enabled": true, "short_sma": 50, "long_sma": 200 },
//!     "rsi_oversold": { "is_enabled": false, "threshold": 30 }
//!   },
//!   "recency": 2,
//!   "x": 20
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{BuiltinSignal, Result, ScreenError};

/// Toggle and parameters of one signal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(rename = "is_enabled", alias = "enabled", default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub params: BTreeMap<String, f64>,
}

impl IndicatorConfig {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }
}

/// Everything a screen needs besides market data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Universe to screen; empty means the market-data universe.
    pub tickers: Vec<String>,
    pub indicator_settings: BTreeMap<String, IndicatorConfig>,
    /// Trading bars back from the series end that still count as fresh.
    pub recency: usize,
    /// Forward horizon in trading bars for success and change statistics.
    pub x: usize,
    pub min_num_instances: usize,
    pub show_only_close_price_above: f64,
    pub show_only_volume_above: f64,
    /// Keep only tickers reporting earnings within this many days.
    pub show_only_earnings_within_days: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tickers: Vec::new(),
            indicator_settings: BTreeMap::new(),
            recency: 2,
            x: 20,
            min_num_instances: 0,
            show_only_close_price_above: 20.0,
            show_only_volume_above: 100_000.0,
            show_only_earnings_within_days: None,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|e| ScreenError::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ScreenError::InvalidConfig(e.to_string()))
    }

    /// Enable `id` with the given parameter overrides.
    pub fn enable(mut self, id: &str, params: &[(&str, f64)]) -> Self {
        let config = params
            .iter()
            .fold(IndicatorConfig::new(true), |c, &(name, value)| c.with_param(name, value));
        self.indicator_settings.insert(id.to_string(), config);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.x == 0 {
            return Err(ScreenError::InvalidValue("x must be > 0"));
        }
        if self.recency == 0 {
            return Err(ScreenError::InvalidValue("recency must be > 0"));
        }
        if matches!(self.show_only_earnings_within_days, Some(d) if d < 0) {
            return Err(ScreenError::InvalidValue("earnings window must be >= 0 days"));
        }
        Ok(())
    }

    /// Resolve every enabled entry through the signal registry, in identifier order.
    pub fn enabled_signals(&self) -> Result<Vec<BuiltinSignal>> {
        let signals = self
            .indicator_settings
            .iter()
            .filter(|(_, config)| config.enabled)
            .map(|(id, config)| {
                let params: HashMap<&str, f64> =
                    config.params.iter().map(|(k, &v)| (k.as_str(), v)).collect();
                BuiltinSignal::from_config(id, &params)
            })
            .collect::<Result<Vec<_>>>()?;
        if signals.is_empty() {
            return Err(ScreenError::InvalidConfig("no signal enabled".into()));
        }
        Ok(signals)
    }
}
