//! Bounded, concurrency-safe caches for expensive handles.
//!
//! One abstraction backs both the catalog cache and the backend filesystem
//! cache: an LRU map behind a fair reader/writer lock, with an optional
//! per-entry time-to-live. The load path is double-checked: a shared-lock
//! probe first, then an exclusive-lock re-check before the loader runs, so
//! concurrent cold misses for the same key collapse into a single load and
//! no caller ever observes a partially-loaded entry.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::RwLock;

use crate::error::Result;

struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// LRU handle cache with double-checked loading.
///
/// With `ttl = None` entries live until evicted by capacity pressure; with a
/// TTL, an entry expires a fixed interval after insertion and is treated as
/// a miss from then on. Loader failures are never cached; the next call for
/// that key retries.
pub struct HandleCache<K, V> {
    inner: RwLock<LruCache<K, Entry<V>>>,
    ttl: Option<Duration>,
}

impl<K, V> HandleCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: NonZeroUsize, ttl: Option<Duration>) -> Self {
        HandleCache {
            inner: RwLock::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Return the cached value for `key`, or run `loader` to produce it.
    ///
    /// The loader runs under the exclusive lock, which is what guarantees a
    /// single load per cold key: every concurrent caller for the same key
    /// blocks until the first one has inserted the value, then hits the
    /// re-check.
    pub fn get_or_load<F>(&self, key: &K, loader: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        {
            let cache = self.inner.read();
            if let Some(entry) = cache.peek(key) {
                if !entry.expired() {
                    return Ok(entry.value.clone());
                }
            }
        }

        let mut cache = self.inner.write();
        // Re-check: another caller may have loaded the entry while we
        // waited for the exclusive lock.
        if let Some(entry) = cache.get(key) {
            if !entry.expired() {
                return Ok(entry.value.clone());
            }
        }

        if self.ttl.is_some() {
            Self::purge_expired(&mut cache);
        }

        let value = loader()?;
        cache.put(
            key.clone(),
            Entry {
                value: value.clone(),
                expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(value)
    }

    /// Drop every expired entry so TTL eviction wins over capacity
    /// eviction when both could apply.
    fn purge_expired(cache: &mut LruCache<K, Entry<V>>) {
        let expired: Vec<K> = cache
            .iter()
            .filter(|(_, entry)| entry.expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            cache.pop(&key);
        }
    }

    /// Number of live entries, counting not-yet-purged expired ones.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` maps to a live, unexpired entry.
    pub fn contains(&self, key: &K) -> bool {
        self.inner
            .read()
            .peek(key)
            .is_some_and(|entry| !entry.expired())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GvfsError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_concurrent_misses_collapse_into_one_load() {
        let cache: Arc<HandleCache<String, Arc<String>>> =
            Arc::new(HandleCache::new(cap(10), None));
        let loads = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let loads = Arc::clone(&loads);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_load(&"k".to_string(), || {
                            loads.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            Ok(Arc::new("handle".to_string()))
                        })
                        .unwrap()
                })
            })
            .collect();

        let values: Vec<Arc<String>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| **v == "handle"));
        // All callers converge on the one loaded handle.
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }

    #[test]
    fn test_lru_bounding_evicts_one_entry() {
        let cache: HandleCache<u32, u32> = HandleCache::new(cap(2), None);
        for key in 0..3 {
            cache.get_or_load(&key, || Ok(key * 10)).unwrap();
        }
        assert_eq!(cache.len(), 2);
        // Key 0 was the least recently used.
        assert!(!cache.contains(&0));
        assert!(cache.contains(&1));
        assert!(cache.contains(&2));
    }

    #[test]
    fn test_ttl_expiry_is_a_miss() {
        let cache: HandleCache<u32, u32> =
            HandleCache::new(cap(10), Some(Duration::from_millis(50)));
        let loads = AtomicUsize::new(0);
        cache
            .get_or_load(&1, || {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        std::thread::sleep(Duration::from_millis(80));
        assert!(!cache.contains(&1));
        cache
            .get_or_load(&1, || {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ttl_purges_first_expired_entry() {
        let cache: HandleCache<u32, u32> =
            HandleCache::new(cap(3), Some(Duration::from_millis(200)));
        cache.get_or_load(&1, || Ok(1)).unwrap();
        std::thread::sleep(Duration::from_millis(120));
        cache.get_or_load(&2, || Ok(2)).unwrap();
        cache.get_or_load(&3, || Ok(3)).unwrap();
        std::thread::sleep(Duration::from_millis(120));
        // Entry 1 has expired by now; 2 and 3 have not. Inserting a fourth
        // key purges the expired entry rather than evicting a live one.
        cache.get_or_load(&4, || Ok(4)).unwrap();
        assert!(!cache.contains(&1));
        assert!(cache.contains(&2));
        assert!(cache.contains(&3));
        assert!(cache.contains(&4));
    }

    #[test]
    fn test_loader_failure_is_not_cached() {
        let cache: HandleCache<u32, u32> = HandleCache::new(cap(10), None);
        let err = cache
            .get_or_load(&1, || {
                Err(GvfsError::Bootstrap("discovery failed".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, GvfsError::Bootstrap(_)));
        assert!(cache.is_empty());
        // The next use retries and can succeed.
        assert_eq!(cache.get_or_load(&1, || Ok(9)).unwrap(), 9);
    }
}
