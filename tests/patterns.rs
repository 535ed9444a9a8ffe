//! Integration tests for the chart-pattern signals on daily input.
//!
//! Fixtures are written as aggregated bars and expanded into two daily bars
//! each, so the pattern signals see exactly the aggregated series under test
//! after their own 2-bar aggregation.

use std::collections::HashMap;

use apexscan::prelude::*;
use chrono::{Duration, NaiveDate};

type Ohlc = (f64, f64, f64, f64);

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 3).unwrap()
}

/// Each aggregated `(o, h, l, c)` becomes `(o, h, l, o)` then `(o, h, l, c)`.
fn daily_from_aggregated(agg: &[Ohlc], lead: usize) -> BarSeries {
    let mut bars = Vec::with_capacity(lead + 2 * agg.len());
    for _ in 0..lead {
        bars.push((60.0, 61.0, 59.0, 60.0));
    }
    for &(o, h, l, c) in agg {
        bars.push((o, h, l, o));
        bars.push((o, h, l, c));
    }
    BarSeries::new(
        bars.iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| Bar::new(start() + Duration::days(i as i64), o, h, l, c, 5e5))
            .collect(),
    )
    .unwrap()
}

fn detect(id: &str, series: &BarSeries) -> Vec<NaiveDate> {
    let signal = BuiltinSignal::from_config(id, &HashMap::new()).unwrap();
    let mut ctx = SeriesContext::new(series);
    signal.detect(&mut ctx).into_iter().collect()
}

/// Trap low at 2, high at 6, flush through 11, reclaim at 14.
fn raging() -> Vec<Ohlc> {
    vec![
        (60.0, 62.0, 58.0, 60.0),
        (58.0, 60.0, 56.0, 57.0),
        (55.0, 56.0, 50.0, 52.0),
        (53.0, 58.0, 52.0, 57.0),
        (57.0, 62.0, 55.0, 61.0),
        (61.0, 66.0, 60.0, 65.0),
        (65.0, 70.0, 64.0, 69.0),
        (68.5, 69.0, 63.0, 63.5),
        (63.0, 64.0, 58.0, 58.5),
        (58.5, 59.0, 55.0, 57.0),
        (57.0, 57.5, 51.0, 51.5),
        (51.5, 52.0, 47.0, 47.5),
        (47.5, 48.0, 45.0, 45.5),
        (45.5, 46.5, 44.0, 46.0),
        (46.0, 53.0, 45.5, 52.5),
        (52.5, 55.0, 52.0, 54.5),
        (54.5, 57.0, 54.0, 56.5),
        (56.5, 59.0, 56.0, 58.5),
        (58.5, 61.0, 58.0, 60.5),
        (60.5, 63.0, 60.0, 62.5),
    ]
}

/// Uptrend with a spike low at 40, Kangaroo at 60, Wallaby at 61,
/// shake-out at 62 and recovery at 63.
fn kangaroo() -> Vec<Ohlc> {
    let mut ohlc: Vec<Ohlc> = (0..60)
        .map(|i| {
            let c = 100.0 + 0.5 * i as f64;
            (c - 0.3, c + 1.0, c - 1.0, c)
        })
        .collect();
    ohlc[40].2 = 115.0;
    ohlc.extend([
        (128.0, 134.0, 126.0, 133.0),
        (130.0, 132.0, 128.0, 131.0),
        (130.0, 131.0, 124.0, 125.0),
        (125.0, 132.0, 124.5, 131.5),
        (131.5, 134.0, 131.0, 133.5),
        (133.5, 135.0, 133.0, 134.5),
        (134.5, 136.5, 134.0, 136.0),
    ]);
    ohlc
}

// ============================================================
// AGGREGATION
// ============================================================

#[test]
fn test_daily_expansion_aggregates_back() {
    let daily = daily_from_aggregated(&raging(), 0);
    let agg = aggregate_pairs(&daily);
    assert_eq!(agg.len(), 20);
    for (bar, &(o, h, l, c)) in agg.bars().iter().zip(raging().iter()) {
        assert_eq!((bar.open, bar.high, bar.low, bar.close), (o, h, l, c));
        assert_eq!(bar.volume, 1e6);
    }
    assert_eq!(agg.bars()[0].date, daily.bars()[1].date);
}

#[test]
fn test_odd_length_drops_oldest_bar() {
    let daily = daily_from_aggregated(&raging(), 1);
    let agg = aggregate_pairs(&daily);
    assert_eq!(agg.len(), 20);
    assert_eq!(agg.bars()[0].open, 60.0);
    assert_eq!(agg.last().unwrap().date, daily.last().unwrap().date);
}

// ============================================================
// MULTI-STAGE PATTERNS
// ============================================================

#[test]
fn test_bull_raging_on_daily_series() {
    let daily = daily_from_aggregated(&raging(), 0);
    assert_eq!(detect("apex_bull_raging", &daily), vec![daily.bars()[29].date]);
}

#[test]
fn test_bull_raging_unaffected_by_leading_odd_bar() {
    let daily = daily_from_aggregated(&raging(), 1);
    assert_eq!(detect("apex_bull_raging", &daily), vec![daily.bars()[30].date]);
}

#[test]
fn test_bull_raging_needs_history() {
    let daily = daily_from_aggregated(&raging()[..4], 0);
    assert!(detect("apex_bull_raging", &daily).is_empty());
}

#[test]
fn test_bull_appear_on_daily_series() {
    let daily = daily_from_aggregated(&kangaroo(), 0);
    assert_eq!(daily.len(), 134);
    // aggregated bar 62 closes on daily bar 125
    assert_eq!(detect("apex_bull_appear", &daily), vec![daily.bars()[125].date]);
}

#[test]
fn test_bull_appear_without_spike_low() {
    let mut ohlc = kangaroo();
    ohlc[40].2 = 119.0;
    let daily = daily_from_aggregated(&ohlc, 0);
    assert!(detect("apex_bull_appear", &daily).is_empty());
}

// ============================================================
// TREND FORMATIONS
// ============================================================

/// Daily pairs from aggregated mid prices: each bar spans `m ± 1` and both
/// daily closes sit at `m`, so daily SMAs are aggregated means.
fn daily_from_mids(mids: &[f64]) -> BarSeries {
    let ohlc: Vec<Ohlc> = mids.iter().map(|&m| (m, m + 1.0, m - 1.0, m)).collect();
    daily_from_aggregated(&ohlc, 0)
}

/// Flat base, then highs A (122), C (128) and lows B (125), D (131) with
/// D < B < C < A.
fn lightning_mids(base: &[(usize, f64)]) -> Vec<f64> {
    let mut mids: Vec<f64> = base
        .iter()
        .flat_map(|&(n, m)| std::iter::repeat(m).take(n))
        .collect();
    assert_eq!(mids.len(), 120);
    mids.extend([
        90.0, 94.0, 100.0, 97.0, 95.0, 92.0, 95.0, 97.0, 98.0, 95.0, 91.0, 88.0, 91.0, 95.0, 97.0,
        99.0,
    ]);
    mids
}

/// Base at 150, then lows A (122), C (128) and highs B (125), D (131) with
/// A < C < B < D.
fn n_mids() -> Vec<f64> {
    let mut mids = vec![150.0; 120];
    mids.extend([
        110.0, 100.0, 92.0, 95.0, 98.0, 101.0, 98.0, 96.0, 94.0, 97.0, 100.0, 104.0, 101.0, 99.0,
    ]);
    mids
}

#[test]
fn test_uptrend_emits_lightning_terminal_date() {
    let daily = daily_from_mids(&lightning_mids(&[(120, 50.0)]));
    assert_eq!(daily.len(), 272);

    let merged = find_extrema(&aggregate_pairs(&daily)).merged();
    let at: Vec<usize> = merged.iter().map(|p| p.index).collect();
    assert_eq!(at, vec![122, 125, 128, 131]);

    // aggregated bar 131 closes on daily bar 263
    assert_eq!(detect("apex_uptrend", &daily), vec![daily.bars()[263].date]);
    assert!(detect("apex_downtrend", &daily).is_empty());
}

#[test]
fn test_uptrend_needs_both_averages() {
    // an old plateau at 200 keeps the 200-bar average above the lows while
    // the 50-bar average only sees the base at 50
    let daily = daily_from_mids(&lightning_mids(&[(60, 200.0), (60, 50.0)]));
    assert!(detect("apex_uptrend", &daily).is_empty());

    let agg = aggregate_pairs(&daily);
    let merged = find_extrema(&agg).merged();
    let mut ctx = SeriesContext::new(&daily);
    let fast = ctx.sma(Field::Close, 50);
    let fast_only = match_formation(&agg, &merged, Formation::Lightning, |p, bar| {
        daily
            .position(p.date)
            .and_then(|i| fast[i])
            .is_some_and(|avg| bar.low >= avg)
    });
    assert_eq!(fast_only.len(), 1);
    assert_eq!(fast_only[0].confirmed_on(), Some(daily.bars()[263].date));
}

#[test]
fn test_downtrend_emits_n_under_fast_average() {
    let daily = daily_from_mids(&n_mids());
    assert_eq!(daily.len(), 268);
    assert_eq!(detect("apex_downtrend", &daily), vec![daily.bars()[263].date]);
    assert!(detect("apex_uptrend", &daily).is_empty());
}

#[test]
fn test_downtrend_rejects_points_above_fast_average() {
    // same zigzag with no base above it: the 50-bar average trails the lows
    let mut mids = n_mids();
    for m in mids.iter_mut().take(120) {
        *m = 60.0;
    }
    let daily = daily_from_mids(&mids);
    let agg = aggregate_pairs(&daily);
    let merged = find_extrema(&agg).merged();
    let shapes = match_formation(&agg, &merged, Formation::N, |_, _| true);
    assert_eq!(shapes.len(), 1);
    assert!(detect("apex_downtrend", &daily).is_empty());
}

#[test]
fn test_formations_silent_without_inflexions() {
    let steady: Vec<Ohlc> = (0..150)
        .map(|i| {
            let c = 50.0 + i as f64;
            (c - 0.5, c + 1.0, c - 1.0, c)
        })
        .collect();
    let daily = daily_from_aggregated(&steady, 0);
    assert!(find_extrema(&aggregate_pairs(&daily)).merged().is_empty());
    assert!(detect("apex_uptrend", &daily).is_empty());
    assert!(detect("apex_downtrend", &daily).is_empty());
}

#[test]
fn test_pattern_dates_belong_to_series() {
    let zigzag: Vec<Ohlc> = (0..160)
        .map(|i| {
            let c = 100.0 + 15.0 * (i as f64 / 3.0).sin() - 0.2 * i as f64;
            (c - 0.5, c + 2.0, c - 2.0, c + 0.5)
        })
        .collect();
    let daily = daily_from_aggregated(&zigzag, 0);
    for id in ["apex_uptrend", "apex_downtrend", "apex_bull_raging", "apex_bull_appear"] {
        for date in detect(id, &daily) {
            assert!(daily.position(date).is_some(), "{id} emitted {date} outside the series");
        }
    }
}
