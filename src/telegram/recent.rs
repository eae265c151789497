//! Size-bounded map that forgets the least recently written key.

use std::collections::HashMap;
use std::hash::Hash;

/// Map holding at most `capacity` entries.
///
/// Inserting a new key into a full map evicts the key whose value was
/// written longest ago.
#[derive(Debug)]
pub struct RecentMap<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, (u64, V)>,
}

impl<K: Eq + Hash + Copy, V> RecentMap<K, V> {
    /// Creates an empty map. A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
        }
    }

    /// Stores `value` under `key` and marks the key as most recent.
    ///
    /// Returns the evicted key, if the map was full.
    pub fn insert(&mut self, key: K, value: V) -> Option<K> {
        self.tick += 1;

        let evicted = if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (written, _))| *written)
                .map(|(k, _)| *k);
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
            oldest
        } else {
            None
        };

        self.entries.insert(key, (self.tick, value));
        evicted
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|(_, value)| value)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
