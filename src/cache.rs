//! Bounded, thread-safe least-recently-used cache.
//!
//! Used to memoize model predictions keyed by media content hash so the
//! same upload is never run through inference twice while it stays hot.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Default number of cached entries
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

struct LruState<K, V> {
    /// key -> (value, last-use tick)
    entries: HashMap<K, (V, u64)>,
    /// last-use tick -> key; the first entry is the eviction candidate
    recency: BTreeMap<u64, K>,
    tick: u64,
}

impl<K: Hash + Eq + Clone, V> LruState<K, V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Fixed-capacity map that evicts the least recently used entry
pub struct LruCache<K, V> {
    capacity: usize,
    state: Mutex<LruState<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq + Clone, V: Clone> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LruState {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                tick: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // Every mutation leaves entries and recency consistent before it can
    // panic, so a poisoned lock still guards valid state.
    fn lock(&self) -> MutexGuard<'_, LruState<K, V>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a value and mark it most recently used
    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let tick = state.next_tick();

        match state.entries.get_mut(key) {
            Some((value, last_used)) => {
                state.recency.remove(&*last_used);
                *last_used = tick;
                state.recency.insert(tick, key.clone());
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Check membership without touching recency
    pub fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Insert or replace a value. Returns the evicted entry, if any.
    pub fn insert(&self, key: K, value: V) -> Option<(K, V)> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let tick = state.next_tick();

        if let Some((old_value, last_used)) = state.entries.get_mut(&key) {
            state.recency.remove(&*last_used);
            *old_value = value;
            *last_used = tick;
            state.recency.insert(tick, key);
            return None;
        }

        let mut evicted = None;
        if state.entries.len() >= self.capacity {
            if let Some((_, oldest)) = state.recency.pop_first() {
                evicted = state
                    .entries
                    .remove(&oldest)
                    .map(|(value, _)| (oldest, value));
            }
        }

        state.recency.insert(tick, key.clone());
        state.entries.insert(key, (value, tick));
        evicted
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let (value, last_used) = state.entries.remove(key)?;
        state.recency.remove(&last_used);
        Some(value)
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.recency.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.len(),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);

        // Touch "a" so "b" becomes the oldest
        assert_eq!(cache.get(&"a"), Some(1));

        let evicted = cache.insert("c", 3);
        assert_eq!(evicted, Some(("b", 2)));
        assert!(cache.contains(&"a"));
        assert!(cache.contains(&"c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_insertion_order_alone_does_not_decide() {
        let cache = LruCache::new(3);
        for (key, value) in [("a", 1), ("b", 2), ("c", 3)] {
            cache.insert(key, value);
        }
        cache.get(&"a");
        cache.get(&"b");

        assert_eq!(cache.insert("d", 4), Some(("c", 3)));
    }

    #[test]
    fn test_replace_refreshes_without_eviction() {
        let cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.insert("a", 10), None);
        assert_eq!(cache.len(), 2);

        // "b" is now the oldest
        assert_eq!(cache.insert("c", 3), Some(("b", 2)));
        assert_eq!(cache.get(&"a"), Some(10));
    }

    #[test]
    fn test_stats_and_remove() {
        let cache = LruCache::new(4);
        cache.insert(1u32, "one".to_string());
        assert!(cache.get(&1).is_some());
        assert!(cache.get(&2).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.len, 1);
        assert_eq!(stats.capacity, 4);

        assert_eq!(cache.remove(&1), Some("one".to_string()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache = LruCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert("a", 1);
        assert_eq!(cache.insert("b", 2), Some(("a", 1)));
    }

    #[test]
    fn test_clear() {
        let cache = LruCache::new(DEFAULT_CACHE_CAPACITY);
        for i in 0..10 {
            cache.insert(i, i * 2);
        }
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&3), None);
    }
}
