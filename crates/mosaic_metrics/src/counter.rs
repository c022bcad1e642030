//! Named counters for world lifecycle events

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Counter {
    counters: HashMap<&'static str, u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
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

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.counters.iter().map(|(name, value)| (*name, *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_accumulate_per_name() {
        let mut counter = Counter::new();
        counter.increment("entities.created", 2);
        counter.increment("entities.created", 3);
        counter.increment("entities.removed", 1);

        assert_eq!(counter.get("entities.created"), 5);
        assert_eq!(counter.get("entities.removed"), 1);
        assert_eq!(counter.get("never"), 0);
        assert_eq!(counter.iter().count(), 2);

        counter.reset_all();
        assert_eq!(counter.get("entities.created"), 0);
    }
}
