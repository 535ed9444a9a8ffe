//! Bar series, 2-bar aggregation and per-series derived overlays.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::signals::helpers::{ema, rolling_mean, rolling_std};
use crate::{Bar, OHLCVExt, Result, ScreenError, OHLCV};

// ============================================================
// BAR SERIES
// ============================================================

/// Ordered daily bars of one instrument; dates strictly increasing.
///
/// Immutable once built. Detectors read it and keep derived values in a
/// [`SeriesContext`].
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series, rejecting unordered or duplicate dates and bad prices.
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                ScreenError::InvalidOHLCV { reason, .. } => {
                    ScreenError::InvalidOHLCV { index: i, reason }
                }
                other => other,
            })?;
        }
        if let Some(i) = bars.windows(2).position(|w| w[0].date >= w[1].date) {
            return Err(ScreenError::UnorderedDates { index: i + 1 });
        }
        Ok(Self { bars })
    }

    /// Build from any dated OHLCV source.
    pub fn from_ohlcv<T: OHLCV>(items: &[T]) -> Result<Self> {
        Self::new(
            items
                .iter()
                .map(|b| Bar::new(b.date(), b.open(), b.high(), b.low(), b.close(), b.volume()))
                .collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    #[inline]
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Position of the bar dated `date`.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }

    pub fn by_date(&self, date: NaiveDate) -> Option<&Bar> {
        self.position(date).map(|i| &self.bars[i])
    }

    /// Bars dated within `[start, end]`.
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> &[Bar] {
        if start > end {
            return &[];
        }
        let lo = self.bars.partition_point(|b| b.date < start);
        let hi = self.bars.partition_point(|b| b.date <= end);
        &self.bars[lo..hi]
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }

    pub fn values(&self, field: Field) -> Vec<f64> {
        self.bars.iter().map(|b| field.of(b)).collect()
    }
}

// ============================================================
// AGGREGATION
// ============================================================

/// Merge consecutive pairs of bars into one: first open, last close, extreme
/// high/low, summed volume.
///
/// Pairs are aligned to the end of the series so the most recent bar always
/// closes a pair; with an odd length the oldest bar is dropped. Each merged
/// bar carries the date of its second (later) bar.
pub fn aggregate_pairs(series: &BarSeries) -> BarSeries {
    let bars = series.bars();
    let skip = bars.len() % 2;
    let merged = bars[skip..]
        .chunks_exact(2)
        .map(|pair| {
            let (first, last) = (&pair[0], &pair[1]);
            Bar {
                date: last.date,
                open: first.open,
                high: first.high.max(last.high),
                low: first.low.min(last.low),
                close: last.close,
                volume: first.volume + last.volume,
            }
        })
        .collect();
    BarSeries { bars: merged }
}

// ============================================================
// OVERLAYS
// ============================================================

/// Bar field an overlay is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    #[inline]
    fn of(self, bar: &Bar) -> f64 {
        match self {
            Field::High => bar.high,
            Field::Low => bar.low,
            Field::Close => bar.close,
            Field::Volume => bar.volume,
        }
    }
}

/// Identity of a derived series: computation kind plus its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKey {
    Sma { field: Field, window: usize },
    StdDev { field: Field, window: usize },
    Ema { field: Field, span: usize },
}

/// Derived values aligned to bar positions; `None` where undefined.
pub type Overlay = Arc<[Option<f64>]>;

/// A series plus the overlays computed on it so far.
///
/// Overlays are owned here, keyed by [`OverlayKey`], so two signals asking for
/// the same window share a computation and signals with different windows
/// never see each other's values.
#[derive(Debug)]
pub struct SeriesContext<'a> {
    series: &'a BarSeries,
    overlays: HashMap<OverlayKey, Overlay>,
}

impl<'a> SeriesContext<'a> {
    pub fn new(series: &'a BarSeries) -> Self {
        Self {
            series,
            overlays: HashMap::new(),
        }
    }

    #[inline]
    pub fn series(&self) -> &'a BarSeries {
        self.series
    }

    /// Simple moving average over `window` bars.
    pub fn sma(&mut self, field: Field, window: usize) -> Overlay {
        self.overlay(OverlayKey::Sma { field, window })
    }

    /// Sample standard deviation over `window` bars.
    pub fn std_dev(&mut self, field: Field, window: usize) -> Overlay {
        self.overlay(OverlayKey::StdDev { field, window })
    }

    /// Exponential moving average with `alpha = 2 / (span + 1)`, seeded with
    /// the first value.
    pub fn ema(&mut self, field: Field, span: usize) -> Overlay {
        self.overlay(OverlayKey::Ema { field, span })
    }

    pub fn overlay(&mut self, key: OverlayKey) -> Overlay {
        let series = self.series;
        self.overlays
            .entry(key)
            .or_insert_with(|| compute_overlay(series, key))
            .clone()
    }

    /// Number of distinct overlays computed so far.
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }
}

fn compute_overlay(series: &BarSeries, key: OverlayKey) -> Overlay {
    match key {
        OverlayKey::Sma { field, window } => rolling_mean(&series.values(field), window).into(),
        OverlayKey::StdDev { field, window } => rolling_std(&series.values(field), window).into(),
        OverlayKey::Ema { field, span } => {
            let alpha = 2.0 / (span as f64 + 1.0);
            ema(&series.values(field), alpha)
                .into_iter()
                .map(Some)
                .collect::<Vec<_>>()
                .into()
        }
    }
}

// ============================================================
// TESTS
// ============================================================
