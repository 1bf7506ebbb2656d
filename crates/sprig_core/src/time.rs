//! Deterministic tick clock
//!
//! Fixed tick rate (60 Hz by default) feeding `World::update` with a
//! constant dt.

use std::time::Duration;

pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// Simulation time tracker
#[derive(Debug, Clone)]
pub struct TickClock {
    tick_duration: Duration,
    tick_count: u64,
    accumulated_time: Duration,
}

impl TickClock {
    pub fn new(tick_rate_hz: u32) -> Self {
        let hz = tick_rate_hz.max(1);
        Self {
            tick_duration: Duration::from_secs(1) / hz,
            tick_count: 0,
            accumulated_time: Duration::ZERO,
        }
    }

    /// Advance one tick and return its length in seconds.
    pub fn advance(&mut self) -> f32 {
        self.tick_count += 1;
        self.accumulated_time += self.tick_duration;
        self.dt()
    }

    pub fn dt(&self) -> f32 {
        self.tick_duration.as_secs_f32()
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_by_fixed_steps() {
        let mut clock = TickClock::new(50);
        let dt = clock.advance();
        clock.advance();
        assert!((dt - 0.02).abs() < 1e-6);
        assert_eq!(clock.tick_count(), 2);
        assert_eq!(clock.total_time(), Duration::from_millis(40));
    }
}
