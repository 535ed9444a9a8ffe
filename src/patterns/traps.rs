//! Trap lookups over inflexion points
//!
//! Low inflexions act as bear traps, High inflexions as bull traps.

use chrono::NaiveDate;

use super::extrema::{ExtremumKind, InflexionPoint};

/// Lowest Low inflexion dated strictly before `before` with its price in
/// `[floor, ceiling]`. Ties keep the earliest point.
pub fn lowest_bear_trap_in_range(
    traps: &[InflexionPoint],
    before: NaiveDate,
    floor: f64,
    ceiling: f64,
) -> Option<&InflexionPoint> {
    traps
        .iter()
        .filter(|t| t.kind == ExtremumKind::Low && t.date < before)
        .filter(|t| floor <= t.price && t.price <= ceiling)
        .reduce(|best, t| if t.price < best.price { t } else { best })
}

/// Highest High inflexion dated strictly before `before` with its price in
/// `[floor, ceiling]`. Ties keep the earliest point.
pub fn highest_bull_trap_in_range(
    traps: &[InflexionPoint],
    before: NaiveDate,
    floor: f64,
    ceiling: f64,
) -> Option<&InflexionPoint> {
    traps
        .iter()
        .filter(|t| t.kind == ExtremumKind::High && t.date < before)
        .filter(|t| floor <= t.price && t.price <= ceiling)
        .reduce(|best, t| if t.price > best.price { t } else { best })
}

/// Points dated within `[start, end]`, order preserved.
pub fn traps_in_date_range(
    traps: &[InflexionPoint],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<&InflexionPoint> {
    traps
        .iter()
        .filter(|t| start <= t.date && t.date <= end)
        .collect()
}
