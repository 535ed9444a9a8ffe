//! Chart patterns on the 2-bar aggregated series
//!
//! # Building Blocks
//!
//! - **Extrema**: 5-bar inflexion points (highs and lows)
//! - **Traps**: lookups of Low (bear trap) and High (bull trap) inflexions
//!
//! # Signals
//!
//! - **Formations (2)**: uptrend (Lightning, M), downtrend (N, W)
//! - **Multi-stage (2)**: Bull-Raging, Bull-Appear (Kangaroo-Wallaby)
//!
//! Every pattern signal aggregates the daily series itself; emitted dates are
//! dates of bars in the daily series.

pub mod bull_appear;
pub mod bull_raging;
pub mod extrema;
pub mod formations;
pub mod traps;

pub use bull_appear::*;
pub use bull_raging::*;
pub use extrema::*;
pub use formations::*;
pub use traps::*;

use std::collections::HashMap;

use crate::{
    params::{ParamMeta, ParameterizedSignal},
    Result,
};

/// Patterns run on fixed thresholds and accept no parameters.
macro_rules! impl_parameterless {
    ($($name:ident => $id:literal),* $(,)?) => {
        $(
            impl ParameterizedSignal for $name {
                fn param_meta() -> &'static [ParamMeta] {
                    &[]
                }

                fn with_params(_params: &HashMap<&str, f64>) -> Result<Self> {
                    Ok(Self)
                }

                fn signal_id_str() -> &'static str {
                    $id
                }
            }
        )*
    };
}

impl_parameterless! {
    UptrendSignal => "apex_uptrend",
    DowntrendSignal => "apex_downtrend",
    BullRagingSignal => "apex_bull_raging",
    BullAppearSignal => "apex_bull_appear",
}
