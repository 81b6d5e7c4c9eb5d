//! Time-boxed suppression sets.
//!
//! A key stays "in flight" until its deadline passes or it is removed
//! explicitly. Expired entries are treated as absent immediately and swept
//! lazily, so no timer exists per key.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct InFlightSet<K> {
    entries: HashMap<K, Instant>,
    window: Duration,
}

impl<K: Eq + Hash> InFlightSet<K> {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            window,
        }
    }

    pub fn contains(&self, key: &K, now: Instant) -> bool {
        self.entries
            .get(key)
            .is_some_and(|deadline| now < *deadline)
    }

    /// Mark `key` as in flight until `now + window`.
    ///
    /// Returns `false` and leaves the existing deadline untouched when the key
    /// is already in flight.
    pub fn try_insert(&mut self, key: K, now: Instant) -> bool {
        if self.contains(&key, now) {
            return false;
        }
        self.entries.insert(key, now + self.window);
        true
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop expired entries and return how many were dropped.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, deadline| now < *deadline);
        before - self.entries.len()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.entries.get(key).copied()
    }
}
