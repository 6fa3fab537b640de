//! Hot write cache.
//!
//! A small, unordered, mutex-protected map that absorbs the most recent
//! writes ahead of the memtable. The engine drains it by calling
//! [`Cache::swap`], which hands back the snapshot and leaves a fresh
//! empty map accepting writes in the same instant — the same handoff
//! shape the memtable uses for flushes.
//!
//! The cache is an accelerator, not a durability layer: every entry it
//! holds is re-inserted into the memtable on drain, and reads consult it
//! first because it holds the newest data.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::trace;

/// Write-absorbing cache in front of the memtable.
#[derive(Debug)]
pub struct Cache {
    values: Mutex<HashMap<String, String>>,
    capacity: usize,
}

impl Cache {
    /// Creates an empty cache draining after `capacity` entries.
    /// `0` means the cache is drained on every write.
    pub fn new(capacity: usize) -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Returns the cached value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Inserts or overwrites a cached value.
    pub fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_owned(), value.to_owned());
    }

    /// Drops a cached value; used when a delete must not be shadowed by
    /// a stale cached write.
    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` when the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// `true` once the cache holds at least `capacity` entries.
    pub fn is_at_capacity(&self) -> bool {
        self.lock().len() >= self.capacity
    }

    /// Atomically replaces the map with a fresh empty one and returns
    /// the snapshot for draining into the memtable.
    pub fn swap(&self) -> HashMap<String, String> {
        let mut values = self.lock();
        let snapshot = std::mem::take(&mut *values);
        trace!(entries = snapshot.len(), "cache swapped");
        snapshot
    }

    /// The map stays coherent even if a holder panicked mid-update, so a
    /// poisoned lock is recovered rather than propagated.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::Cache;

    #[test]
    fn set_then_get() {
        let cache = Cache::new(8);
        cache.set("k", "v");
        assert_eq!(cache.get("k"), Some("v".to_owned()));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn overwrite_keeps_len() {
        let cache = Cache::new(8);
        cache.set("k", "v1");
        cache.set("k", "v2");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), Some("v2".to_owned()));
    }

    #[test]
    fn swap_returns_snapshot_and_empties() {
        let cache = Cache::new(2);
        cache.set("a", "1");
        cache.set("b", "2");
        assert!(cache.is_at_capacity());

        let snapshot = cache.swap();
        assert_eq!(snapshot.len(), 2);
        assert!(cache.is_empty());
        assert!(!cache.is_at_capacity());
    }

    #[test]
    fn zero_capacity_is_always_full() {
        let cache = Cache::new(0);
        assert!(cache.is_at_capacity());
    }

    #[test]
    fn remove_drops_entry() {
        let cache = Cache::new(8);
        cache.set("k", "v");
        cache.remove("k");
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }
}
