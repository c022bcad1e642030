//! Deterministic time and tick sources
//!
//! The world never decides when a frame runs. It pulls `Tick`s from an
//! injected `TickSource`: a fixed-step source for tests and headless runs, or
//! a real-time source that paces ticks against the wall clock.

use std::thread;
use std::time::{Duration, Instant};

/// Default simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// One frame's worth of timing information handed to systems.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Zero-based frame number.
    pub index: u64,
    /// Simulated time at the start of this tick.
    pub elapsed: Duration,
    /// Simulated time this tick covers.
    pub delta: Duration,
}

impl Tick {
    pub fn new(index: u64, elapsed: Duration, delta: Duration) -> Self {
        Self {
            index,
            elapsed,
            delta,
        }
    }

    #[inline]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

/// Produces ticks until exhausted.
pub trait TickSource {
    fn next_tick(&mut self) -> Option<Tick>;
}

impl<F> TickSource for F
where
    F: FnMut() -> Option<Tick>,
{
    fn next_tick(&mut self) -> Option<Tick> {
        self()
    }
}

/// Simulation time tracker
#[derive(Debug, Default)]
pub struct SimulationTime {
    tick_count: u64,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn advance_tick(&mut self, step: Duration) {
        self.tick_count += 1;
        self.accumulated_time += step;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

/// Emits ticks of a constant step as fast as they are requested.
#[derive(Debug)]
pub struct FixedTickSource {
    time: SimulationTime,
    step: Duration,
    limit: Option<u64>,
}

impl FixedTickSource {
    pub fn new(step: Duration) -> Self {
        Self {
            time: SimulationTime::new(),
            step,
            limit: None,
        }
    }

    /// Step derived from a rate; a zero rate falls back to `TICK_RATE_HZ`.
    pub fn from_rate_hz(rate_hz: u32) -> Self {
        let rate = if rate_hz == 0 { TICK_RATE_HZ } else { rate_hz };
        Self::new(Duration::from_secs(1) / rate)
    }

    /// Stop after `ticks` ticks.
    pub fn with_limit(mut self, ticks: u64) -> Self {
        self.limit = Some(ticks);
        self
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn ticks_emitted(&self) -> u64 {
        self.time.tick_count()
    }
}

impl Default for FixedTickSource {
    fn default() -> Self {
        Self::new(TICK_DURATION)
    }
}

impl TickSource for FixedTickSource {
    fn next_tick(&mut self) -> Option<Tick> {
        if self.limit.is_some_and(|limit| self.time.tick_count() >= limit) {
            return None;
        }
        let tick = Tick::new(self.time.tick_count(), self.time.total_time(), self.step);
        self.time.advance_tick(self.step);
        Some(tick)
    }
}

/// Fixed-step ticks paced against the wall clock: `next_tick` sleeps until the
/// tick's simulated start time has been reached.
#[derive(Debug)]
pub struct RealtimeTickSource {
    inner: FixedTickSource,
    started: Option<Instant>,
}

impl RealtimeTickSource {
    pub fn new(inner: FixedTickSource) -> Self {
        Self {
            inner,
            started: None,
        }
    }
}

impl TickSource for RealtimeTickSource {
    fn next_tick(&mut self) -> Option<Tick> {
        let tick = self.inner.next_tick()?;
        let started = *self.started.get_or_insert_with(Instant::now);
        let due = started + tick.elapsed;
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
        Some(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_source_counts_and_stops() {
        let mut source = FixedTickSource::new(Duration::from_millis(10)).with_limit(3);

        let ticks: Vec<Tick> = std::iter::from_fn(|| source.next_tick()).collect();
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[0], Tick::new(0, Duration::ZERO, Duration::from_millis(10)));
        assert_eq!(ticks[2].index, 2);
        assert_eq!(ticks[2].elapsed, Duration::from_millis(20));
        assert_eq!(source.ticks_emitted(), 3);
        assert!(source.next_tick().is_none());
    }

    #[test]
    fn rate_zero_falls_back_to_default() {
        assert_eq!(
            FixedTickSource::from_rate_hz(0).step(),
            Duration::from_secs(1) / TICK_RATE_HZ
        );
        assert_eq!(FixedTickSource::from_rate_hz(100).step(), Duration::from_millis(10));
    }

    #[test]
    fn closures_are_tick_sources() {
        let mut remaining = 2;
        let mut source = move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            Some(Tick::new(0, Duration::ZERO, TICK_DURATION))
        };
        assert!(source.next_tick().is_some());
        assert!(source.next_tick().is_some());
        assert!(source.next_tick().is_none());
    }

    #[test]
    fn realtime_source_passes_ticks_through() {
        let mut source =
            RealtimeTickSource::new(FixedTickSource::new(Duration::from_micros(50)).with_limit(2));
        assert_eq!(source.next_tick().map(|t| t.index), Some(0));
        assert_eq!(source.next_tick().map(|t| t.index), Some(1));
        assert!(source.next_tick().is_none());
    }
}
