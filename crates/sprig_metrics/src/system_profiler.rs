//! Per-system wall-clock timing

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Accumulated timing for one named system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemTiming {
    pub calls: u64,
    pub last: Duration,
    pub total: Duration,
}

impl SystemTiming {
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

#[derive(Debug, Default)]
pub struct SystemProfiler {
    timings: HashMap<String, SystemTiming>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
        }
    }

    pub fn time_system<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(name, start.elapsed());
        result
    }

    /// Record an externally measured run (used when the timed code needs
    /// the same `&mut` borrow that owns the profiler).
    pub fn record(&mut self, name: &str, elapsed: Duration) {
        let timing = match self.timings.get_mut(name) {
            Some(timing) => timing,
            None => self.timings.entry(name.to_string()).or_default(),
        };
        timing.calls += 1;
        timing.last = elapsed;
        timing.total += elapsed;
    }

    pub fn timing(&self, name: &str) -> Option<SystemTiming> {
        self.timings.get(name).copied()
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SystemTiming)> {
        self.timings.iter().map(|(name, timing)| (name.as_str(), timing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_and_totals() {
        let mut profiler = SystemProfiler::new();
        profiler.record("MoveSystem", Duration::from_millis(2));
        profiler.record("MoveSystem", Duration::from_millis(4));

        let timing = profiler.timing("MoveSystem").unwrap();
        assert_eq!(timing.calls, 2);
        assert_eq!(timing.last, Duration::from_millis(4));
        assert_eq!(timing.total, Duration::from_millis(6));
        assert_eq!(timing.average(), Duration::from_millis(3));
        assert!(profiler.timing("RenderSystem").is_none());
    }

    #[test]
    fn record_keeps_names_apart() {
        let mut profiler = SystemProfiler::new();
        profiler.record("SpawnSystem", Duration::from_millis(1));
        profiler.record("MoveSystem", Duration::from_millis(5));
        profiler.record("SpawnSystem", Duration::from_millis(3));

        assert_eq!(profiler.iter().count(), 2);
        let spawn = profiler.timing("SpawnSystem").unwrap();
        assert_eq!((spawn.calls, spawn.total), (2, Duration::from_millis(4)));
        let moved = profiler.timing("MoveSystem").unwrap();
        assert_eq!((moved.calls, moved.last), (1, Duration::from_millis(5)));
    }

    #[test]
    fn time_system_returns_closure_result() {
        let mut profiler = SystemProfiler::new();
        let value = profiler.time_system("LifeTimeSystem", || 41 + 1);
        assert_eq!(value, 42);
        assert_eq!(profiler.timing("LifeTimeSystem").map(|t| t.calls), Some(1));
    }
}
