//! Per-system timing for the world update loop

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Accumulated cost of one system across every tick it ran.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SystemTiming {
    pub total: Duration,
    pub calls: u64,
}

impl SystemTiming {
    pub fn average(&self) -> Duration {
        match u32::try_from(self.calls) {
            Ok(0) => Duration::ZERO,
            Ok(calls) => self.total / calls,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.calls as f64),
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
        let elapsed = start.elapsed();

        if !self.timings.contains_key(name) {
            self.timings.insert(name.to_string(), SystemTiming::default());
        }
        if let Some(timing) = self.timings.get_mut(name) {
            timing.total += elapsed;
            timing.calls += 1;
        }
        result
    }

    pub fn timing(&self, name: &str) -> SystemTiming {
        self.timings.get(name).copied().unwrap_or_default()
    }

    /// Drop the record of a system that has been deregistered.
    pub fn forget(&mut self, name: &str) {
        self.timings.remove(name);
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
    fn calls_accumulate_per_name() {
        let mut profiler = SystemProfiler::new();
        profiler.time_system("render", || ());
        profiler.time_system("render", || ());
        profiler.time_system("movement", || ());

        assert_eq!(profiler.timing("render").calls, 2);
        assert_eq!(profiler.timing("movement").calls, 1);
        assert_eq!(profiler.timing("missing"), SystemTiming::default());

        profiler.forget("render");
        assert_eq!(profiler.timing("render").calls, 0);
    }

    #[test]
    fn average_handles_call_counts_past_u32() {
        let timing = SystemTiming {
            total: Duration::from_secs(1 << 33),
            calls: 1 << 32,
        };
        assert_eq!(timing.average(), Duration::from_secs(2));

        let small = SystemTiming {
            total: Duration::from_millis(30),
            calls: 3,
        };
        assert_eq!(small.average(), Duration::from_millis(10));
        assert_eq!(SystemTiming::default().average(), Duration::ZERO);
    }
}
