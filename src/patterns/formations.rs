//! Trend formations over inflexion points
//!
//! A formation is a fixed number of consecutive inflexion points (in date
//! order, highs and lows merged) starting from a seed of a given kind, whose
//! bar highs and lows follow a template. Each point must also pass a
//! moving-average gate evaluated on the daily series at the point's date.
//!
//! Points are labelled `a` (the seed) through `e`. Shapes are written as the
//! ascending order both the highs and the lows of the points must follow:
//!
//! | Formation | Seed | Points | Order (lowest first) | Gate |
//! |-----------|------|--------|----------------------|------|
//! | Lightning | High | 4 | d < b < c < a | low ≥ SMA50 and SMA200 |
//! | M         | Low  | 5 | a < e < c < b < d | low ≥ SMA50 and SMA200 |
//! | N         | Low  | 4 | a < c < b < d | low ≤ SMA50 |
//! | W         | High | 5 | d < b < c < e < a | low ≤ SMA50 |

use tracing::debug;

use super::extrema::{find_extrema, ExtremumKind, InflexionPoint};
use crate::{
    series::{aggregate_pairs, Field, Overlay},
    Bar, BarSeries, Direction, SeriesContext, SignalDetector, SignalId, TriggerDates,
};

/// Fast gate average (daily closes)
pub const FORMATION_FAST_SMA: usize = 50;
/// Slow gate average (daily closes)
pub const FORMATION_SLOW_SMA: usize = 200;

// ============================================================
// FORMATION TEMPLATES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Formation {
    Lightning,
    M,
    N,
    W,
}

impl Formation {
    pub fn seed(self) -> ExtremumKind {
        match self {
            Formation::Lightning | Formation::W => ExtremumKind::High,
            Formation::M | Formation::N => ExtremumKind::Low,
        }
    }

    pub fn len(self) -> usize {
        match self {
            Formation::Lightning | Formation::N => 4,
            Formation::M | Formation::W => 5,
        }
    }

    pub fn trend(self) -> Direction {
        match self {
            Formation::Lightning | Formation::M => Direction::Bullish,
            Formation::N | Formation::W => Direction::Bearish,
        }
    }

    /// Point offsets ordered from lowest to highest.
    fn order(self) -> &'static [usize] {
        match self {
            Formation::Lightning => &[3, 1, 2, 0],
            Formation::M => &[0, 4, 2, 1, 3],
            Formation::N => &[0, 2, 1, 3],
            Formation::W => &[3, 1, 2, 4, 0],
        }
    }

    /// Template check on the bars under each point: every step of the order
    /// must rise strictly on both high and low.
    fn shape_holds(self, bars: &[&Bar]) -> bool {
        self.order().windows(2).all(|w| {
            let (lower, upper) = (bars[w[0]], bars[w[1]]);
            lower.high < upper.high && lower.low < upper.low
        })
    }
}

/// A satisfied formation
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FormationMatch {
    pub formation: Formation,
    pub points: Vec<InflexionPoint>,
}

impl FormationMatch {
    /// Date of the terminal point; the trend-confirmation date.
    pub fn confirmed_on(&self) -> Option<chrono::NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

/// Find every occurrence of `formation` in `points` (merged inflexions of
/// `series`). `gate` is applied to each point with the bar it sits on.
pub fn match_formation(
    series: &BarSeries,
    points: &[InflexionPoint],
    formation: Formation,
    gate: impl Fn(&InflexionPoint, &Bar) -> bool,
) -> Vec<FormationMatch> {
    let n = formation.len();
    let mut found = Vec::new();

    for (pos, seed) in points.iter().enumerate() {
        if seed.kind != formation.seed() || pos + n > points.len() {
            continue;
        }
        let window = &points[pos..pos + n];
        let Some(bars) = window
            .iter()
            .map(|p| series.get(p.index))
            .collect::<Option<Vec<&Bar>>>()
        else {
            continue;
        };
        if !formation.shape_holds(&bars) {
            continue;
        }
        if !window.iter().zip(bars.iter()).all(|(p, b)| gate(p, b)) {
            debug!(formation = ?formation, seed = %seed.date, "shape matched, moving-average gate failed");
            continue;
        }
        debug!(formation = ?formation, seed = %seed.date, "formation confirmed");
        found.push(FormationMatch {
            formation,
            points: window.to_vec(),
        });
    }
    found
}

// ============================================================
// TREND SIGNALS
// ============================================================

fn formation_dates(
    ctx: &mut SeriesContext<'_>,
    formations: &[Formation],
    gate: impl Fn(usize, &Bar) -> bool,
) -> TriggerDates {
    let daily = ctx.series();
    let agg = aggregate_pairs(daily);
    let merged = find_extrema(&agg).merged();

    formations
        .iter()
        .flat_map(|&f| {
            match_formation(&agg, &merged, f, |p, bar| {
                daily.position(p.date).is_some_and(|i| gate(i, bar))
            })
        })
        .filter_map(|m| m.confirmed_on())
        .collect()
}

fn at_or_above(avg: &Overlay, i: usize, level: f64) -> bool {
    avg.get(i).copied().flatten().is_some_and(|v| level >= v)
}

fn at_or_below(avg: &Overlay, i: usize, level: f64) -> bool {
    avg.get(i).copied().flatten().is_some_and(|v| level <= v)
}

/// Lightning or M formation on the aggregated series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UptrendSignal;

impl SignalDetector for UptrendSignal {
    fn id(&self) -> SignalId {
        SignalId("apex_uptrend")
    }

    fn min_bars(&self) -> usize {
        FORMATION_SLOW_SMA
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        let fast = ctx.sma(Field::Close, FORMATION_FAST_SMA);
        let slow = ctx.sma(Field::Close, FORMATION_SLOW_SMA);
        formation_dates(ctx, &[Formation::Lightning, Formation::M], |i, bar| {
            at_or_above(&fast, i, bar.low) && at_or_above(&slow, i, bar.low)
        })
    }
}

/// N or W formation on the aggregated series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DowntrendSignal;

impl SignalDetector for DowntrendSignal {
    fn id(&self) -> SignalId {
        SignalId("apex_downtrend")
    }

    fn min_bars(&self) -> usize {
        FORMATION_FAST_SMA
    }

    fn detect(&self, ctx: &mut SeriesContext<'_>) -> TriggerDates {
        let fast = ctx.sma(Field::Close, FORMATION_FAST_SMA);
        formation_dates(ctx, &[Formation::N, Formation::W], |i, bar| {
            at_or_below(&fast, i, bar.low)
        })
    }
}
