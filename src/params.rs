//! Parameter schemas for signals
//!
//! Every registered signal declares its tunable parameters, which enables:
//! - Type-checked configuration from loosely typed settings maps
//! - Parameter documentation
//! - Automatic configuration UI generation
//!
//! # Example
//!
//! ```rust
//! use apexscan::params::ParameterizedSignal;
//! use apexscan::prelude::*;
//!
//! for param in GoldenCrossSignal::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{Period, Result, ScreenError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Window length in bars (positive integer)
  Period,
  /// Level compared against an indicator value (e.g. RSI 70)
  Threshold,
  /// Scale factor applied to a standard deviation
  Multiplier,
}

/// Metadata for a single signal parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name as it appears in settings (e.g., "short_sma")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Accepted range: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn threshold(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Threshold, default, range, description }
  }

  pub const fn multiplier(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Multiplier, default, range, description }
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(ScreenError::OutOfRange { field: self.name, value, min, max });
    }
    if self.param_type == ParamType::Period && (value < 1.0 || value.fract() != 0.0) {
      return Err(ScreenError::InvalidValue("Period must be a positive integer"));
    }
    Ok(())
  }
}

// ============================================================
// PARAMETERIZED SIGNAL TRAIT
// ============================================================

/// Trait for signals constructible from a settings map
pub trait ParameterizedSignal: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a signal with parameters from a HashMap
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Identifier used in settings (e.g. "golden_cross_sma")
  fn signal_id_str() -> &'static str;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 1.0 || value.fract() != 0.0 {
    return Err(ScreenError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Helper to get a finite number from params with default fallback
pub fn get_value(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<f64> {
  let value = params.get(key).copied().unwrap_or(default);
  if !value.is_finite() {
    return Err(ScreenError::InvalidValue("Parameter must be finite"));
  }
  Ok(value)
}

// ============================================================
// TESTS
// ============================================================
