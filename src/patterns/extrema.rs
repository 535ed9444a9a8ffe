//! Inflexion points on an aggregated series
//!
//! A bar is a High inflexion when its high is strictly above the highs of the
//! two bars on either side, and a Low inflexion when its low is strictly below
//! the lows of the two bars on either side. The first and last two bars are
//! never inflexions.

use chrono::NaiveDate;

use crate::{BarSeries, OHLCV};

/// Bars on each side an inflexion must dominate.
pub const EXTREMUM_REACH: usize = 2;

/// Which side of the price range an inflexion marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ExtremumKind {
    High,
    Low,
}

/// A local extremum: the bar's high for `High`, its low for `Low`
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct InflexionPoint {
    pub date: NaiveDate,
    pub price: f64,
    pub kind: ExtremumKind,
    /// Position in the series the point was found on
    pub index: usize,
}

/// High and Low inflexions, each in date order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extrema {
    pub highs: Vec<InflexionPoint>,
    pub lows: Vec<InflexionPoint>,
}

impl Extrema {
    /// Highs and lows merged into one date-ordered sequence.
    pub fn merged(&self) -> Vec<InflexionPoint> {
        let mut all: Vec<InflexionPoint> = self.highs.iter().chain(self.lows.iter()).copied().collect();
        all.sort_by_key(|p| p.index);
        all
    }
}

/// Scan `series` for inflexion points.
pub fn find_extrema(series: &BarSeries) -> Extrema {
    let bars = series.bars();
    let mut extrema = Extrema::default();
    if bars.len() < 2 * EXTREMUM_REACH + 1 {
        return extrema;
    }

    for i in EXTREMUM_REACH..bars.len() - EXTREMUM_REACH {
        let neighbours = (1..=EXTREMUM_REACH).flat_map(|d| [&bars[i - d], &bars[i + d]]);
        let bar = &bars[i];

        if neighbours.clone().all(|n| bar.high() > n.high()) {
            extrema.highs.push(InflexionPoint {
                date: bar.date(),
                price: bar.high(),
                kind: ExtremumKind::High,
                index: i,
            });
        } else if neighbours.into_iter().all(|n| bar.low() < n.low()) {
            extrema.lows.push(InflexionPoint {
                date: bar.date(),
                price: bar.low(),
                kind: ExtremumKind::Low,
                index: i,
            });
        }
    }
    extrema
}
