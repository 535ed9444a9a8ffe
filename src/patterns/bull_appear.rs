//! Bull-Appear: Kangaroo-Wallaby inside bar that shakes out below the
//! Kangaroo and recovers into its range.

use tracing::debug;

use super::extrema::find_extrema;
use super::traps::traps_in_date_range;
use crate::{
    series::{aggregate_pairs, Field},
    BarSeries, OHLCVExt, SeriesContext, SignalDetector, SignalId, TriggerDates,
};

/// Aggregated bars searched for active bear traps before a Wallaby.
pub const TRAP_LOOKBACK: usize = 126;
/// Bars after the Wallaby checked for the shake-out and recovery.
pub const FOLLOW_THROUGH_BARS: usize = 4;
/// Bars ahead of the Kangaroo the slow average must not decline over.
pub const SLOPE_BARS: usize = 5;
/// Confirmation window length, starting one bar before the Kangaroo.
pub const CONFIRM_BARS: usize = 6;

const SMA_SHORT: usize = 20;
const SMA_MID: usize = 50;
const SMA_LONG: usize = 200;

/// Bull-Appear confirmation dates. `ctx` must wrap the aggregated series.
pub fn bull_appear_dates(ctx: &mut SeriesContext<'_>) -> TriggerDates {
    let sma20 = ctx.sma(Field::Close, SMA_SHORT);
    let sma50 = ctx.sma(Field::Close, SMA_MID);
    let sma200 = ctx.sma(Field::Close, SMA_LONG);
    let series: &BarSeries = ctx.series();
    let bars = series.bars();
    let lows = find_extrema(series).lows;
    let mut dates = TriggerDates::new();

    for w in 2..bars.len() {
        let k = w - 1;
        let (kangaroo, wallaby) = (&bars[k], &bars[w]);
        if !(wallaby.high < kangaroo.high && wallaby.low > kangaroo.low) {
            continue;
        }

        let first = w.saturating_sub(TRAP_LOOKBACK);
        let active = traps_in_date_range(&lows, bars[first].date, bars[k - 1].date);
        if active.is_empty() {
            debug!(wallaby = %wallaby.date, "rejected: no active bear trap");
            continue;
        }

        if let Some(later) = sma200.get(k + SLOPE_BARS) {
            if let (Some(now), Some(later)) = (sma200[k], *later) {
                if now > later {
                    debug!(wallaby = %wallaby.date, "rejected: slow average declining");
                    continue;
                }
            }
        }

        if !sma50[k].is_some_and(|avg| kangaroo.low >= avg) {
            debug!(wallaby = %wallaby.date, "rejected: kangaroo below the 50-bar average");
            continue;
        }

        let mut broke_below = false;
        let mut recovered = false;
        for bar in bars.iter().skip(w + 1).take(FOLLOW_THROUGH_BARS) {
            if bar.high > kangaroo.high {
                break;
            }
            if bar.low < kangaroo.low {
                broke_below = true;
            }
            if broke_below
                && kangaroo.low <= bar.close
                && bar.close <= kangaroo.high
                && bar.is_bullish_reversal()
            {
                recovered = true;
                break;
            }
        }
        if !(broke_below && recovered) {
            debug!(wallaby = %wallaby.date, broke_below, recovered, "rejected: no shake-out and recovery");
            continue;
        }

        let confirmation = (0..CONFIRM_BARS)
            .map(|i| (i, k - 1 + i))
            .take_while(|&(_, p)| p < bars.len())
            .find(|&(i, p)| {
                let bar = &bars[p];
                let trap_hit = active.iter().any(|t| bar.straddles(t.price));
                let average_touch = i > 0
                    && [&sma20, &sma50, &sma200]
                        .iter()
                        .any(|avg| avg[p].is_some_and(|v| bar.straddles(v)));
                trap_hit || average_touch
            });

        match confirmation {
            Some((_, p)) => {
                debug!(wallaby = %wallaby.date, date = %bars[p].date, "bull appear confirmed");
                dates.insert(bars[p].date);
            }
            None => debug!(wallaby = %wallaby.date, "rejected: no trap or average touched"),
        }
    }
    dates
}

/// Bull-Appear pattern on the 2-bar aggregated series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BullAppearSignal;

impl SignalDetector for BullAppearSignal {
    fn id(&self) -> SignalId {
        SignalId("apex_bull_appear")
    }

    fn min_bars(&self) -> usize {
        // the 50-bar average must exist on the aggregated series
        2 * SMA_MID
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        let agg = aggregate_pairs(ctx.series());
        let mut agg_ctx = SeriesContext::new(&agg);
        bull_appear_dates(&mut agg_ctx)
    }
}
