//! Named monotonic counters (flush statistics, rebuild counts, ...)

use std::collections::BTreeMap;

/// Counters keyed by static names so the hot path never allocates a key.
#[derive(Debug, Default)]
pub struct Counter {
    counters: BTreeMap<&'static str, u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            counters: BTreeMap::new(),
        }
    }

    pub fn increment(&mut self, name: &'static str, value: u64) {
        *self.counters.entry(name).or_insert(0) += value;
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }

    /// Name-ordered copy of every counter, for log lines and tests.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        self.counters.iter().map(|(name, value)| (*name, *value)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_accumulate_per_name() {
        let mut counter = Counter::new();
        counter.increment("queries.full_rebuilds", 1);
        counter.increment("commands.applied", 3);
        counter.increment("commands.applied", 2);

        assert_eq!(counter.get("commands.applied"), 5);
        assert_eq!(counter.get("missing"), 0);
        assert_eq!(
            counter.snapshot(),
            vec![("commands.applied", 5), ("queries.full_rebuilds", 1)]
        );

        counter.reset_all();
        assert!(counter.snapshot().is_empty());
    }
}
