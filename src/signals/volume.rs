//! Volume spike signal

use std::collections::HashMap;

use super::helpers::dates_at;
use crate::{
    params::{get_period, get_value, ParamMeta, ParameterizedSignal},
    series::Field,
    Period, Result, SeriesContext, SignalDetector, SignalId, TriggerDates,
};

impl_with_defaults!(VolumeSpikeSignal);

/// Volume strictly above its rolling mean plus `num_std_dev` rolling
/// standard deviations
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSpikeSignal {
    pub window: Period,
    pub num_std_dev: f64,
}

impl Default for VolumeSpikeSignal {
    fn default() -> Self {
        Self {
            window: Period::new_const(20),
            num_std_dev: 2.0,
        }
    }
}

impl SignalDetector for VolumeSpikeSignal {
    fn id(&self) -> SignalId {
        SignalId("volume_spike")
    }

    fn min_bars(&self) -> usize {
        self.window.get()
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        let mean = ctx.sma(Field::Volume, self.window.get());
        let sigma = ctx.std_dev(Field::Volume, self.window.get());
        let series = ctx.series();
        let k = self.num_std_dev;
        dates_at(
            series,
            series.bars().iter().enumerate().filter_map(|(i, bar)| {
                let (m, s) = (mean[i]?, sigma[i]?);
                (bar.volume > m + k * s).then_some(i)
            }),
        )
    }

    fn params(&self) -> Vec<(&'static str, f64)> {
        vec![("window", self.window.get() as f64), ("num_std_dev", self.num_std_dev)]
    }
}

static VOLUME_SPIKE_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("window", 20.0, (2.0, 500.0, 1.0), "Rolling volume window"),
    ParamMeta::multiplier("num_std_dev", 2.0, (0.0, 10.0, 0.5), "Spike distance in standard deviations"),
];

impl ParameterizedSignal for VolumeSpikeSignal {
    fn param_meta() -> &'static [ParamMeta] {
        VOLUME_SPIKE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            window: get_period(params, "window", 20)?,
            num_std_dev: get_value(params, "num_std_dev", 2.0)?,
        })
    }

    fn signal_id_str() -> &'static str {
        "volume_spike"
    }
}
