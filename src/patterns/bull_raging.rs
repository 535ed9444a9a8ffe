//! Bull-Raging: a flush-down from a high through a prior bear trap, followed
//! by a quick bullish reclaim of the trap.
//!
//! Evaluated per High inflexion on the aggregated series:
//!
//! 1. The stopping point is the next Low inflexion priced below the high, or
//!    the last bar.
//! 2. The bear trap is the lowest Low inflexion before the high priced within
//!    `[stopping low, high]`.
//! 3. The first flush-down bar in the high→stop window must start at or above
//!    the midpoint between trap and high.
//! 4. The window needs at least 5 bars, 30% of them flush-down.
//! 5. Some bar in the window must break below the trap.
//! 6. Within 6 bars from that break, a bullish reversal bar closing above the
//!    trap confirms the pattern on its date.

use tracing::debug;

use super::extrema::{find_extrema, InflexionPoint};
use super::traps::lowest_bear_trap_in_range;
use crate::{
    series::aggregate_pairs, BarSeries, OHLCVExt, SeriesContext, SignalDetector, SignalId,
    TriggerDates,
};

/// Fewest bars between high and stopping point.
pub const MIN_WINDOW_BARS: usize = 5;
/// Minimum share of flush-down bars in the window.
pub const MIN_FLUSH_SHARE: f64 = 0.3;
/// Bars scanned for the reclaim, counting the break bar.
pub const RECLAIM_SCAN_BARS: usize = 6;

/// Bull-Raging confirmation dates on an already aggregated series.
pub fn bull_raging_dates(agg: &BarSeries) -> TriggerDates {
    let extrema = find_extrema(agg);
    extrema
        .highs
        .iter()
        .filter_map(|high| confirm_high(agg, high, &extrema.lows))
        .collect()
}

fn confirm_high(
    agg: &BarSeries,
    high: &InflexionPoint,
    lows: &[InflexionPoint],
) -> Option<chrono::NaiveDate> {
    let bars = agg.bars();
    let stop = lows
        .iter()
        .find(|l| l.index > high.index && l.price < high.price)
        .map_or(bars.len() - 1, |l| l.index);

    let Some(trap) = lowest_bear_trap_in_range(lows, high.date, bars[stop].low, high.price) else {
        debug!(high = %high.date, "rejected: no bear trap below the high");
        return None;
    };

    let midpoint = trap.price + (high.price - trap.price) / 2.0;
    let window = &bars[high.index..=stop];
    let flush_count = window.iter().filter(|b| b.is_flush_down()).count();

    match window.iter().find(|b| b.is_flush_down()) {
        Some(first) if first.high >= midpoint => {}
        Some(first) => {
            debug!(high = %high.date, flush_start = first.high, midpoint, "rejected: flush-down started below midpoint");
            return None;
        }
        None => {
            debug!(high = %high.date, "rejected: no flush-down bar");
            return None;
        }
    }

    if window.len() < MIN_WINDOW_BARS
        || (flush_count as f64) / (window.len() as f64) < MIN_FLUSH_SHARE
    {
        debug!(high = %high.date, bars = window.len(), flush_count, "rejected: window too short or too few flush-down bars");
        return None;
    }

    let Some(offset) = window.iter().position(|b| b.low < trap.price) else {
        debug!(high = %high.date, trap = trap.price, "rejected: trap never broken");
        return None;
    };
    let break_at = high.index + offset;

    let reclaim = bars[break_at..]
        .iter()
        .take(RECLAIM_SCAN_BARS)
        .find(|b| b.close > trap.price && b.is_bullish_reversal());

    match reclaim {
        Some(bar) => {
            debug!(high = %high.date, trap = %trap.date, date = %bar.date, "bull raging confirmed");
            Some(bar.date)
        }
        None => {
            debug!(high = %high.date, "rejected: no reclaim bar after the break");
            None
        }
    }
}

/// Bull-Raging pattern on the 2-bar aggregated series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BullRagingSignal;

impl SignalDetector for BullRagingSignal {
    fn id(&self) -> SignalId {
        SignalId("apex_bull_raging")
    }

    fn min_bars(&self) -> usize {
        // five aggregated bars for a single inflexion
        10
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        bull_raging_dates(&aggregate_pairs(ctx.series()))
    }
}
