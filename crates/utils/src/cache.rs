//! Memoizing results by key, optionally bounded with LRU eviction.

use gizmos_core::{Error, Result};
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Remembers computed values so equal keys are only computed once
///
/// With a `maxsize` the least recently used entry is evicted once the cache
/// is full; without one the cache grows without bound. Values are computed
/// outside the lock, so two threads missing on the same key at once may
/// both compute it and the last one stored wins. Failed computations are
/// never cached.
pub struct MemoCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, V>>,
    maxsize: Option<NonZeroUsize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> MemoCache<K, V> {
    /// Create a cache holding at most `maxsize` entries, or unbounded for `None`
    pub fn new(maxsize: Option<usize>) -> Result<Self> {
        let maxsize = maxsize
            .map(|size| {
                NonZeroUsize::new(size)
                    .ok_or_else(|| Error::invalid_argument("maxsize", "0 must be >= 1"))
            })
            .transpose()?;
        let entries = match maxsize {
            Some(size) => LruCache::new(size),
            None => LruCache::unbounded(),
        };
        tracing::debug!(maxsize = ?maxsize, "created memo cache");
        Ok(Self {
            entries: Mutex::new(entries),
            maxsize,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            maxsize: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached value for `key`, marking it most recently used
    pub fn get(&self, key: &K) -> Option<V> {
        let value = self.entries.lock().get(key).cloned();
        let counter = if value.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute(&key);
        self.insert(key, value.clone());
        value
    }

    /// Like [`get_or_insert_with`](Self::get_or_insert_with), leaving the cache
    /// untouched when `compute` fails
    pub fn try_get_or_insert_with<F, E>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce(&K) -> std::result::Result<V, E>,
        E: Into<Error>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute(&key).map_err(Into::into)?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Store `value`, evicting the least recently used entry when full
    pub fn insert(&self, key: K, value: V) {
        self.entries.lock().put(key, value);
    }

    /// Whether `key` is cached, without touching its recency
    pub fn contains(&self, key: &K) -> bool {
        self.entries.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn maxsize(&self) -> Option<usize> {
        self.maxsize.map(NonZeroUsize::get)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Drop every entry and reset the hit and miss counters
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Decorate `f` so each distinct argument is computed once
    pub fn wrap<'a, F>(&'a self, f: F) -> impl Fn(K) -> V + 'a
    where
        F: Fn(&K) -> V + 'a,
    {
        move |key| self.get_or_insert_with(key, &f)
    }
}

impl<K: Hash + Eq, V> fmt::Debug for MemoCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCache")
            .field("len", &self.entries.lock().len())
            .field("maxsize", &self.maxsize)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gizmos_core::ErrorKind;
    use std::cell::Cell;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_repeated_keys_are_computed_once() {
        let cache = MemoCache::unbounded();
        let calls = Cell::new(0);
        let square = |x: &u64| {
            calls.set(calls.get() + 1);
            x * x
        };

        assert_eq!(cache.get_or_insert_with(3, square), 9);
        assert_eq!(cache.get_or_insert_with(3, square), 9);
        assert_eq!(cache.get_or_insert_with(4, square), 16);

        assert_eq!(calls.get(), 2);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.maxsize(), None);
    }

    #[test]
    fn test_least_recently_used_entry_is_evicted() {
        let cache = MemoCache::new(Some(2)).unwrap();
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.get(&"a"), Some(1));

        cache.insert("c", 3);
        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_maxsize_rejected() {
        let err = MemoCache::<u8, u8>::new(Some(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache = MemoCache::new(Some(4)).unwrap();
        let err = cache
            .try_get_or_insert_with("port", |_| {
                "x".parse::<u16>()
                    .map_err(|e| Error::custom("ParseIntError", e.to_string()))
            })
            .unwrap_err();
        assert_eq!(err.name(), "ParseIntError");
        assert!(cache.is_empty());

        let port = cache
            .try_get_or_insert_with("port", |_| Ok::<_, Error>(8080_u16))
            .unwrap();
        assert_eq!(port, 8080);
        assert_eq!(cache.get(&"port"), Some(8080));
    }

    #[test]
    fn test_clear_resets_entries_and_counters() {
        let cache = MemoCache::new(Some(8)).unwrap();
        let double = cache.wrap(|x: &i32| x * 2);
        assert_eq!(double(5), 10);
        assert_eq!(double(5), 10);
        assert_eq!(cache.hits(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.hits(), 0);
        assert_eq!(cache.misses(), 0);
    }

    #[test]
    fn test_shared_between_threads() {
        let cache = Arc::new(MemoCache::new(Some(16)).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    (0..8u32)
                        .map(|n| cache.get_or_insert_with(n, |n| n + 100))
                        .sum::<u32>()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), (100..108).sum::<u32>());
        }
        assert_eq!(cache.len(), 8);
    }
}
