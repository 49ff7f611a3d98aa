// Keyed in-memory store with per-entry expiry

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub trait TtlCache<V>: Send + Sync {
    /// Live value under `key`; expired entries are misses.
    fn get(&self, key: &str) -> Option<V>;
    fn set_with_ttl(&self, key: &str, value: V, ttl: Duration);
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_live(&self) -> bool {
        self.inserted.elapsed() < self.ttl
    }
}

#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone + Send> TtlCache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        self.lock().insert(
            key.to_string(),
            Entry {
                value,
                inserted: Instant::now(),
                ttl,
            },
        );
    }
}
