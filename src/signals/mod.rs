//! Indicator signals
//!
//! Stateless detectors mapping a daily bar series and parameters to the set
//! of dates on which a classic technical condition holds.
//!
//! # Signal Families
//!
//! - **Moving averages (4)**: SMA golden/death cross, MACD bullish/bearish cross
//! - **Oscillators (2)**: RSI overbought/oversold
//! - **Bands (4)**: Bollinger squeeze, expansion, breakout, pullback
//! - **Volume (1)**: volume spike

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple signal types.
macro_rules! impl_with_defaults {
  ($($signal:ty),* $(,)?) => {
    $(impl $signal {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod bollinger;
pub mod moving_average;
pub mod oscillator;
pub mod volume;

pub use bollinger::*;
pub use moving_average::*;
pub use oscillator::*;
pub use volume::*;
