//! Explicit memo of signal trigger dates
//!
//! Entries are keyed by ticker, the date of the last bar the signal saw, the
//! signal identifier and its parameter values. A new bar changes the last-bar
//! date, so stale entries never match; [`SignalCache::purge_stale`] drops them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::{BuiltinSignal, SignalId, TriggerDates};

/// Identity of one cached signal evaluation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub ticker: String,
    pub last_bar: NaiveDate,
    pub signal: SignalId,
    /// Parameter names with the bit patterns of their values
    pub params: Vec<(&'static str, u64)>,
}

impl CacheKey {
    pub fn new(ticker: &str, last_bar: NaiveDate, signal: &BuiltinSignal) -> Self {
        Self {
            ticker: ticker.to_string(),
            last_bar,
            signal: signal.id(),
            params: signal
                .params()
                .into_iter()
                .map(|(name, value)| (name, value.to_bits()))
                .collect(),
        }
    }
}

/// Thread-safe signal cache shared across screening workers.
#[derive(Debug, Default)]
pub struct SignalCache {
    entries: RwLock<HashMap<CacheKey, Arc<TriggerDates>>>,
}

impl SignalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<TriggerDates>> {
        self.entries.read().get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, dates: TriggerDates) -> Arc<TriggerDates> {
        let dates = Arc::new(dates);
        self.entries.write().insert(key, Arc::clone(&dates));
        dates
    }

    /// Cached value for `key`, computing and storing it on a miss.
    ///
    /// `compute` runs without the lock held; two workers missing the same key
    /// may both compute, the later insert wins with an identical value.
    pub fn get_or_insert_with(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> TriggerDates,
    ) -> Arc<TriggerDates> {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        self.insert(key, compute())
    }

    /// Drop every entry of `ticker`.
    pub fn invalidate_ticker(&self, ticker: &str) {
        self.entries.write().retain(|k, _| k.ticker != ticker);
    }

    /// Drop entries of `ticker` computed on a different last bar.
    pub fn purge_stale(&self, ticker: &str, last_bar: NaiveDate) {
        self.entries
            .write()
            .retain(|k, _| k.ticker != ticker || k.last_bar == last_bar);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Params;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn signal(short: f64) -> BuiltinSignal {
        let params = Params::from([("short_sma", short)]);
        BuiltinSignal::from_config("golden_cross_sma", &params).unwrap()
    }

    #[test]
    fn test_key_includes_parameters() {
        let a = CacheKey::new("AAPL", day(1), &signal(20.0));
        let b = CacheKey::new("AAPL", day(1), &signal(30.0));
        assert_ne!(a, b);
        assert_eq!(a, CacheKey::new("AAPL", day(1), &signal(20.0)));
    }

    #[test]
    fn test_get_or_insert_computes_once() {
        let cache = SignalCache::new();
        let key = CacheKey::new("MSFT", day(2), &signal(20.0));
        let mut calls = 0;
        let first = cache.get_or_insert_with(key.clone(), || {
            calls += 1;
            TriggerDates::from([day(1)])
        });
        let second = cache.get_or_insert_with(key, || unreachable!());
        assert_eq!(calls, 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_purge_stale_keeps_current_and_other_tickers() {
        let cache = SignalCache::new();
        cache.insert(CacheKey::new("AAPL", day(1), &signal(20.0)), TriggerDates::new());
        cache.insert(CacheKey::new("AAPL", day(2), &signal(20.0)), TriggerDates::new());
        cache.insert(CacheKey::new("MSFT", day(1), &signal(20.0)), TriggerDates::new());

        cache.purge_stale("AAPL", day(2));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&CacheKey::new("AAPL", day(1), &signal(20.0))).is_none());
        assert!(cache.get(&CacheKey::new("MSFT", day(1), &signal(20.0))).is_some());

        cache.invalidate_ticker("MSFT");
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
