//! Wall-clock timing of world ticks

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct TickTimer {
    tick_start: Option<Instant>,
    tick_times: RingBuffer<Duration>,
    ticks_recorded: u64,
}

impl TickTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            tick_start: None,
            tick_times: RingBuffer::new(capacity),
            ticks_recorded: 0,
        }
    }

    pub fn begin(&mut self) {
        self.tick_start = Some(Instant::now());
    }

    /// Ignored unless paired with a preceding `begin`.
    pub fn end(&mut self) {
        if let Some(start) = self.tick_start.take() {
            self.tick_times.push(start.elapsed());
            self.ticks_recorded += 1;
        }
    }

    pub fn ticks_recorded(&self) -> u64 {
        self.ticks_recorded
    }

    pub fn ticks_per_second(&self) -> f64 {
        let avg = self.tick_times.average();
        if avg.as_secs_f64() > 0.0 {
            1.0 / avg.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn tick_time_ms(&self) -> f64 {
        self.tick_times.average().as_secs_f64() * 1000.0
    }

    pub fn tick_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.tick_times.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(120)
    }
}
