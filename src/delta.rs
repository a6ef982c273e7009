//! Differencing of monotonically increasing OS counters.
//!
//! Counters are only ever compared with the previous reading of the same
//! stream. A stream seen for the first time, or one that went backwards
//! (reboot, counter reset), establishes a new baseline and yields zero.

use std::collections::HashMap;
use std::hash::Hash;

/// Sentinel the platform reports for counters it does not support.
pub const UNSUPPORTED: i64 = -1;

/// Returns the counter value, or `None` when the platform reported it as unsupported.
///
/// Callers must filter with this before handing a value to [`DeltaCounter::delta`],
/// otherwise the sentinel would be recorded as a baseline.
#[must_use]
pub const fn supported(value: i64) -> Option<i64> {
    if value < 0 {
        None
    } else {
        Some(value)
    }
}

/// Stateful differencer keyed by counter stream.
#[derive(Debug, Clone)]
pub struct DeltaCounter<K> {
    previous: HashMap<K, i64>,
}

impl<K: Eq + Hash> DeltaCounter<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            previous: HashMap::new(),
        }
    }

    /// Returns the growth of `key` since its previous reading.
    ///
    /// The first reading of a key and any reading below the previous one
    /// become the new baseline and return `0`.
    pub fn delta(&mut self, key: K, value: i64) -> i64 {
        match self.previous.insert(key, value) {
            Some(prev) if value >= prev => value.saturating_sub(prev),
            _ => 0,
        }
    }

    /// Last recorded value for `key`.
    #[must_use]
    pub fn baseline(&self, key: &K) -> Option<i64> {
        self.previous.get(key).copied()
    }

    /// Drops the baseline of `key`; its next reading starts over.
    pub fn forget(&mut self, key: &K) -> bool {
        self.previous.remove(key).is_some()
    }

    /// Drops every baseline for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.previous.retain(|k, _| keep(k));
    }

    pub fn clear(&mut self) {
        self.previous.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}

impl<K: Eq + Hash> Default for DeltaCounter<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(values: &[i64]) -> Vec<i64> {
        let mut counter = DeltaCounter::new();
        values.iter().map(|&v| counter.delta("rx", v)).collect()
    }

    #[test]
    fn first_reading_is_baseline() {
        let mut counter = DeltaCounter::new();
        assert_eq!(counter.delta("wlan0", 123_456), 0);
        assert_eq!(counter.baseline(&"wlan0"), Some(123_456));
    }

    #[test]
    fn increasing_sequence() {
        assert_eq!(run(&[100, 150, 170]), vec![0, 50, 20]);
    }

    #[test]
    fn reset_becomes_new_baseline() {
        assert_eq!(run(&[100, 150, 40]), vec![0, 50, 0]);
        assert_eq!(run(&[100, 150, 40, 90]), vec![0, 50, 0, 50]);
    }

    #[test]
    fn extreme_values_saturate() {
        let mut counter = DeltaCounter::new();
        counter.delta("rx", i64::MIN);
        assert_eq!(counter.delta("rx", i64::MAX), i64::MAX);
    }

    #[test]
    fn unchanged_counter_yields_zero() {
        assert_eq!(run(&[7, 7, 7]), vec![0, 0, 0]);
    }

    #[test]
    fn keys_are_independent() {
        let mut counter = DeltaCounter::new();
        assert_eq!(counter.delta((1000_u32, "rx"), 10), 0);
        assert_eq!(counter.delta((1001_u32, "rx"), 500), 0);
        assert_eq!(counter.delta((1000_u32, "rx"), 25), 15);
        assert_eq!(counter.delta((1001_u32, "rx"), 600), 100);
        assert_eq!(counter.len(), 2);
    }

    #[test]
    fn forget_and_retain_restart_streams() {
        let mut counter = DeltaCounter::new();
        counter.delta("a", 10);
        counter.delta("b", 10);
        assert!(counter.forget(&"a"));
        assert!(!counter.forget(&"a"));
        assert_eq!(counter.delta("a", 50), 0);

        counter.retain(|k| *k != "b");
        assert_eq!(counter.baseline(&"b"), None);
        assert_eq!(counter.delta("b", 30), 0);

        counter.clear();
        assert!(counter.is_empty());
    }

    #[test]
    fn unsupported_sentinel_is_filtered() {
        assert_eq!(supported(UNSUPPORTED), None);
        assert_eq!(supported(0), Some(0));
        assert_eq!(supported(42), Some(42));
    }
}
