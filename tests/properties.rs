//! Property tests for screening invariants.
//!
//! 1. Trigger dates always belong to the series
//! 2. Opposite crosses never fire on the same bar
//! 3. Common dates are the exact intersection, and another signal only narrows them
//! 4. Re-evaluation is deterministic and memoized screening agrees with it

use std::collections::HashMap;

use apexscan::prelude::*;
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

// ── Strategies ───────────────────────────────────────────────────────

/// Random walk of daily bars with closes kept in [25, 500].
fn arb_series() -> impl Strategy<Value = BarSeries> {
    prop::collection::vec((-2.0..2.0_f64, 0.0..1.5_f64, 1e5..1e7_f64), 60..260).prop_map(|steps| {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut close = 60.0_f64;
        let bars = steps
            .iter()
            .enumerate()
            .map(|(i, &(step, spread, volume))| {
                let open = close;
                close = (close + step).clamp(25.0, 500.0);
                Bar::new(
                    start + Duration::days(i as i64),
                    open,
                    open.max(close) + spread,
                    open.min(close) - spread,
                    close,
                    volume,
                )
            })
            .collect();
        BarSeries::new(bars).unwrap()
    })
}

fn signal(id: &str, params: &[(&str, f64)]) -> BuiltinSignal {
    let params: HashMap<&str, f64> = params.iter().copied().collect();
    BuiltinSignal::from_config(id, &params).unwrap()
}

fn fast_settings() -> Settings {
    Settings {
        x: 5,
        recency: 10,
        ..Settings::default()
    }
    .enable("golden_cross_sma", &[("short_sma", 5.0), ("long_sma", 20.0)])
}

// ── 1. Dates belong to the series ────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn trigger_dates_within_series(series in arb_series()) {
        let mut ctx = SeriesContext::new(&series);
        for id in BuiltinSignal::available() {
            let dates = signal(id, &[]).detect(&mut ctx);
            for date in dates {
                prop_assert!(series.position(date).is_some(), "{} emitted {}", id, date);
            }
        }
    }

    // ── 2. Opposite crosses ──────────────────────────────────────────

    #[test]
    fn opposite_crosses_exclusive(series in arb_series()) {
        let mut ctx = SeriesContext::new(&series);
        let short = [("short_sma", 5.0), ("long_sma", 20.0)];
        let golden = signal("golden_cross_sma", &short).detect(&mut ctx);
        let death = signal("death_cross_sma", &short).detect(&mut ctx);
        prop_assert!(golden.is_disjoint(&death));

        let bull = signal("macd_bullish", &[]).detect(&mut ctx);
        let bear = signal("macd_bearish", &[]).detect(&mut ctx);
        prop_assert!(bull.is_disjoint(&bear));
    }

    // ── 3. Narrowing ─────────────────────────────────────────────────

    #[test]
    fn extra_signal_narrows(series in arb_series()) {
        let base = Settings { recency: 10_000, ..fast_settings() };
        let wider = base.clone().enable("rsi_overbought", &[("threshold", 50.0)]);
        let screener = Screener::new(wider).unwrap();

        let per_signal = screener.evaluate(&series);
        let mut sets = per_signal.values();
        let first = sets.next().cloned().unwrap_or_default();
        let expected: Vec<NaiveDate> = sets
            .fold(first, |acc, set| acc.intersection(set).copied().collect())
            .into_iter()
            .collect();

        match screener.analyze_stock(&series) {
            Some(narrow) => {
                prop_assert_eq!(narrow.total_instances, expected.len());
                if expected.is_empty() {
                    prop_assert!(narrow.common_dates.is_none());
                } else {
                    prop_assert_eq!(narrow.common_dates.as_ref(), Some(&expected));
                }
                prop_assert!((0.0..=100.0).contains(&narrow.success_rate));

                let broad = analyze_stock(&series, &base).unwrap();
                prop_assert!(broad.is_some());
                let broad = broad.unwrap();
                prop_assert!(narrow.total_instances <= broad.total_instances);
                if let Some(dates) = &narrow.common_dates {
                    let wide = broad.common_dates.unwrap_or_default();
                    prop_assert!(dates.iter().all(|d| wide.contains(d)), "{:?} not within {:?}", dates, wide);
                }
            }
            None => prop_assert!(per_signal.values().any(|set| set.is_empty())),
        }
    }

    // ── 4. Determinism and memoization ───────────────────────────────

    #[test]
    fn evaluation_deterministic(series in arb_series()) {
        let settings = BuiltinSignal::available()
            .into_iter()
            .fold(Settings::default(), |s, id| s.enable(id, &[]));
        let screener = Screener::new(settings).unwrap();
        prop_assert_eq!(screener.evaluate(&series), screener.evaluate(&series));
    }

    #[test]
    fn cached_matches_direct(series in arb_series()) {
        let settings = fast_settings().enable("volume_spike", &[("num_std_dev", 1.0)]);
        let screener = Screener::new(settings).unwrap();

        let direct = screener.analyze_stock(&series);
        let cached = screener.analyze_ticker("RAND", &series);
        let again = screener.analyze_ticker("RAND", &series);
        prop_assert_eq!(&cached, &again);

        match (direct, cached) {
            (None, None) => {}
            (Some(d), Some(c)) => {
                prop_assert_eq!(d.common_dates, c.common_dates);
                prop_assert_eq!(d.total_instances, c.total_instances);
                prop_assert_eq!(d.forward, c.forward);
            }
            (d, c) => prop_assert!(false, "direct {:?} vs cached {:?}", d, c),
        }
    }
}
