//! Named counters for tracking engine operations

use std::collections::BTreeMap;

/// Named `usize` counters, iterated in name order.
#[derive(Debug, Default, Clone)]
pub struct Counter {
    counters: BTreeMap<String, usize>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            counters: BTreeMap::new(),
        }
    }

    pub fn increment(&mut self, name: &str, value: usize) {
        match self.counters.get_mut(name) {
            Some(slot) => *slot += value,
            None => {
                self.counters.insert(name.to_string(), value);
            }
        }
    }

    pub fn set(&mut self, name: &str, value: usize) {
        self.counters.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn reset(&mut self, name: &str) {
        if let Some(slot) = self.counters.get_mut(name) {
            *slot = 0;
        }
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &usize)> {
        self.counters.iter()
    }
}
