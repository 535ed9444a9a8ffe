//! Composite screening
//!
//! A [`Screener`] evaluates every enabled signal on a ticker's series,
//! intersects their trigger dates and scores how often those dates preceded
//! a higher close. Universe screens run tickers in parallel with rayon and
//! collect per-ticker failures next to the results.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, SignalCache};
use crate::config::Settings;
use crate::{BarSeries, BuiltinSignal, Result, ScreenError, SeriesContext, SignalResult, TriggerDates};

/// Tickers whose latest close is below this are never screened.
pub const MIN_CLOSE_PRICE: f64 = 20.0;
/// Forward horizons (trading bars) reported by universe screens.
pub const FIXED_HORIZONS: [usize; 3] = [1, 5, 20];

// ============================================================
// MARKET DATA
// ============================================================

/// Source of bar series and calendar data for a universe screen.
pub trait MarketData: Send + Sync {
    /// Tickers screened when the settings name none.
    fn universe(&self) -> Vec<String>;

    fn fetch_bars(&self, ticker: &str) -> Result<BarSeries>;

    fn next_earnings_date(&self, _ticker: &str) -> Option<NaiveDate> {
        None
    }
}

// ============================================================
// RESULTS
// ============================================================

/// Forward outcome of the common dates at one horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonStats {
    pub horizon: usize,
    /// Dates whose close `horizon` bars later was higher
    pub success_count: usize,
    /// Sum of percentage changes over evaluated dates
    pub total_percentage_change: f64,
    /// Dates with a bar `horizon` positions ahead
    pub evaluated: usize,
}

impl HorizonStats {
    fn compute(series: &BarSeries, positions: &[usize], horizon: usize) -> Self {
        let bars = series.bars();
        let mut stats = Self {
            horizon,
            success_count: 0,
            total_percentage_change: 0.0,
            evaluated: 0,
        };
        for &pos in positions {
            let Some(ahead) = pos.checked_add(horizon).and_then(|p| bars.get(p)) else {
                continue;
            };
            let now = bars[pos].close;
            if ahead.close > now {
                stats.success_count += 1;
            }
            stats.total_percentage_change += (ahead.close - now) / now * 100.0;
            stats.evaluated += 1;
        }
        stats
    }
}

/// Outcome of screening one ticker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningResult {
    /// Intersection of all trigger dates; `None` when the latest one is not
    /// more recent than the recency cutoff.
    pub common_dates: Option<Vec<NaiveDate>>,
    pub total_instances: usize,
    /// Percentage of instances followed by a higher close `x` bars later
    pub success_rate: f64,
    /// Mean percentage change `x` bars later, over instances with that much history
    pub avg_percentage_change: f64,
    /// Raw statistics behind the two rates above
    pub forward: HorizonStats,
    /// 1/5/20-bar statistics; filled by universe screens only
    pub horizons: Option<Vec<HorizonStats>>,
}

impl ScreeningResult {
    pub fn is_fresh(&self) -> bool {
        self.common_dates.is_some()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.common_dates.as_ref()?.last().copied()
    }
}

/// A ticker that passed every universe filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerResult {
    pub ticker: String,
    pub latest_close: f64,
    pub latest_volume: f64,
    pub next_earnings: Option<NaiveDate>,
    pub result: ScreeningResult,
}

/// Failure to screen a single ticker
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{ticker}: {error}")]
pub struct ScanError {
    pub ticker: String,
    pub error: ScreenError,
}

/// Pooled rates at one horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonSummary {
    pub horizon: usize,
    pub success_rate: f64,
    pub avg_percentage_change: f64,
}

/// Rates pooled over every reported instance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UniverseSummary {
    pub tickers: usize,
    pub total_instances: usize,
    pub success_rate: f64,
    pub avg_percentage_change: f64,
    pub horizons: Vec<HorizonSummary>,
}

impl UniverseSummary {
    /// Sums of successes and changes divided by the pooled instance count.
    pub fn from_results(results: &[TickerResult]) -> Self {
        let total: usize = results.iter().map(|r| r.result.total_instances).sum();
        let (success_rate, avg_percentage_change) =
            pooled(results.iter().map(|r| &r.result.forward), total);
        let horizons = FIXED_HORIZONS
            .iter()
            .map(|&h| {
                let stats = results
                    .iter()
                    .filter_map(|r| r.result.horizons.as_ref())
                    .flat_map(|hs| hs.iter().filter(move |s| s.horizon == h));
                let (success_rate, avg_percentage_change) = pooled(stats, total);
                HorizonSummary {
                    horizon: h,
                    success_rate,
                    avg_percentage_change,
                }
            })
            .collect();

        Self {
            tickers: results.len(),
            total_instances: total,
            success_rate,
            avg_percentage_change,
            horizons,
        }
    }
}

fn pooled<'a>(stats: impl Iterator<Item = &'a HorizonStats>, total: usize) -> (f64, f64) {
    if total == 0 {
        return (0.0, 0.0);
    }
    let (wins, change) = stats.fold((0usize, 0.0), |(w, c), s| {
        (w + s.success_count, c + s.total_percentage_change)
    });
    (wins as f64 / total as f64 * 100.0, change / total as f64)
}

/// Everything a universe screen produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UniverseReport {
    pub results: Vec<TickerResult>,
    #[serde(skip)]
    pub errors: Vec<ScanError>,
    pub summary: UniverseSummary,
}

// ============================================================
// SCREENER
// ============================================================

/// Compiled settings plus a signal cache shared by screening workers.
#[derive(Debug)]
pub struct Screener {
    settings: Settings,
    signals: Vec<BuiltinSignal>,
    cache: SignalCache,
}

enum Outcome {
    Hit(Box<TickerResult>),
    Skipped,
    Failed(ScanError),
}

impl Screener {
    /// Resolve the enabled signals; fails on unknown identifiers, bad
    /// parameters or an empty enabled set.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let signals = settings.enabled_signals()?;
        Ok(Self {
            settings,
            signals,
            cache: SignalCache::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn signals(&self) -> &[BuiltinSignal] {
        &self.signals
    }

    pub fn cache(&self) -> &SignalCache {
        &self.cache
    }

    /// Trigger dates of every enabled signal, without the veto or statistics.
    pub fn evaluate(&self, series: &BarSeries) -> SignalResult {
        let mut ctx = SeriesContext::new(series);
        self.signals
            .iter()
            .map(|s| (s.id(), s.detect(&mut ctx)))
            .collect()
    }

    /// Screen one series. `None` when the series is empty, its latest close
    /// is under [`MIN_CLOSE_PRICE`], or any enabled signal never fired.
    pub fn analyze_stock(&self, series: &BarSeries) -> Option<ScreeningResult> {
        self.screen(series, false, |signal, ctx| Arc::new(signal.detect(ctx)))
    }

    /// Like [`Screener::analyze_stock`] but memoized per ticker and with the
    /// fixed-horizon statistics filled in.
    pub fn analyze_ticker(&self, ticker: &str, series: &BarSeries) -> Option<ScreeningResult> {
        let last_bar = series.last()?.date;
        self.cache.purge_stale(ticker, last_bar);
        self.screen(series, true, |signal, ctx| {
            let key = CacheKey::new(ticker, last_bar, signal);
            self.cache.get_or_insert_with(key, || signal.detect(ctx))
        })
    }

    fn screen(
        &self,
        series: &BarSeries,
        with_horizons: bool,
        mut dates_of: impl FnMut(&BuiltinSignal, &mut SeriesContext<'_>) -> Arc<TriggerDates>,
    ) -> Option<ScreeningResult> {
        let last = series.last()?;
        if last.close < MIN_CLOSE_PRICE {
            debug!(close = last.close, "skipped: latest close under floor");
            return None;
        }

        let mut ctx = SeriesContext::new(series);
        let mut common: Option<TriggerDates> = None;
        for signal in &self.signals {
            let dates = dates_of(signal, &mut ctx);
            if dates.is_empty() {
                debug!(signal = %signal.id(), "skipped: signal never fired");
                return None;
            }
            common = Some(match common {
                None => (*dates).clone(),
                Some(acc) => acc.intersection(&dates).copied().collect(),
            });
        }
        let common: Vec<NaiveDate> = common.unwrap_or_default().into_iter().collect();
        let positions: Vec<usize> = common.iter().filter_map(|&d| series.position(d)).collect();

        let forward = HorizonStats::compute(series, &positions, self.settings.x);
        let total_instances = common.len();
        let success_rate = if total_instances > 0 {
            forward.success_count as f64 / total_instances as f64 * 100.0
        } else {
            0.0
        };
        let avg_percentage_change = if forward.evaluated > 0 {
            forward.total_percentage_change / forward.evaluated as f64
        } else {
            0.0
        };

        let fresh = match (common.last(), recency_cutoff(series, self.settings.recency)) {
            (Some(latest), Some(cutoff)) => *latest > cutoff,
            _ => false,
        };
        let horizons = with_horizons.then(|| {
            FIXED_HORIZONS
                .iter()
                .map(|&h| HorizonStats::compute(series, &positions, h))
                .collect()
        });

        Some(ScreeningResult {
            common_dates: fresh.then_some(common),
            total_instances,
            success_rate,
            avg_percentage_change,
            forward,
            horizons,
        })
    }

    /// Screen the settings' tickers (or the provider's universe) in parallel.
    ///
    /// Only fresh results passing the instance, price, volume and earnings
    /// filters are reported. Fetch failures are collected, never fatal.
    pub fn analyze_everything<P: MarketData + ?Sized>(&self, provider: &P) -> UniverseReport {
        let tickers = if self.settings.tickers.is_empty() {
            provider.universe()
        } else {
            self.settings.tickers.clone()
        };

        let outcomes: Vec<Outcome> = tickers
            .par_iter()
            .map(|ticker| self.screen_ticker(provider, ticker))
            .collect();

        let mut report = UniverseReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Hit(hit) => report.results.push(*hit),
                Outcome::Skipped => {}
                Outcome::Failed(e) => report.errors.push(e),
            }
        }
        report.summary = UniverseSummary::from_results(&report.results);

        info!(
            tickers = tickers.len(),
            hits = report.results.len(),
            errors = report.errors.len(),
            instances = report.summary.total_instances,
            "universe screen finished"
        );
        report
    }

    fn screen_ticker<P: MarketData + ?Sized>(&self, provider: &P, ticker: &str) -> Outcome {
        let series = match provider.fetch_bars(ticker) {
            Ok(series) => series,
            Err(error) => {
                warn!(ticker, %error, "market data unavailable");
                return Outcome::Failed(ScanError {
                    ticker: ticker.to_string(),
                    error,
                });
            }
        };
        let Some(result) = self.analyze_ticker(ticker, &series) else {
            return Outcome::Skipped;
        };
        let Some(last) = series.last() else {
            return Outcome::Skipped;
        };

        let s = &self.settings;
        if !result.is_fresh() {
            debug!(ticker, "filtered: no recent common date");
            return Outcome::Skipped;
        }
        if result.total_instances < s.min_num_instances {
            debug!(ticker, instances = result.total_instances, "filtered: too few instances");
            return Outcome::Skipped;
        }
        if last.close < s.show_only_close_price_above || last.volume < s.show_only_volume_above {
            debug!(ticker, close = last.close, volume = last.volume, "filtered: price or volume");
            return Outcome::Skipped;
        }

        let next_earnings = provider.next_earnings_date(ticker);
        if let Some(days) = s.show_only_earnings_within_days {
            let until = Duration::try_days(days).and_then(|d| last.date.checked_add_signed(d));
            let within = next_earnings
                .is_some_and(|d| d >= last.date && until.map_or(true, |u| d <= u));
            if !within {
                debug!(ticker, "filtered: earnings not within window");
                return Outcome::Skipped;
            }
        }

        Outcome::Hit(Box::new(TickerResult {
            ticker: ticker.to_string(),
            latest_close: last.close,
            latest_volume: last.volume,
            next_earnings,
            result,
        }))
    }
}

/// Date `recency` positions back from the series end (clamped to the first bar).
fn recency_cutoff(series: &BarSeries, recency: usize) -> Option<NaiveDate> {
    let len = series.len();
    let back = recency.min(len.checked_sub(1)?);
    let pos = if back == 0 { 0 } else { len - back };
    series.get(pos).map(|b| b.date)
}

/// Screen one series with one-off settings.
pub fn analyze_stock(series: &BarSeries, settings: &Settings) -> Result<Option<ScreeningResult>> {
    Ok(Screener::new(settings.clone())?.analyze_stock(series))
}

/// Screen a universe with one-off settings.
pub fn analyze_everything<P: MarketData + ?Sized>(
    provider: &P,
    settings: &Settings,
) -> Result<UniverseReport> {
    Ok(Screener::new(settings.clone())?.analyze_everything(provider))
}
