//! Host frame timing over a sliding window

use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub struct FrameTimer {
    frame_start: Instant,
    window: usize,
    samples: VecDeque<Duration>,
    frames: u64,
}

impl FrameTimer {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            frame_start: Instant::now(),
            window,
            samples: VecDeque::with_capacity(window),
            frames: 0,
        }
    }

    pub fn begin(&mut self) {
        self.frame_start = Instant::now();
    }

    pub fn end(&mut self) {
        self.push(self.frame_start.elapsed());
    }

    fn push(&mut self, sample: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.frames += 1;
    }

    /// Total frames measured since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    pub fn fps(&self) -> f64 {
        let avg = self.average().as_secs_f64();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.average().as_secs_f64() * 1000.0
    }
}
