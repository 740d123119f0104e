use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Monotonic clock source used for TTL computation.
///
/// Production code uses [`SystemClock`]; tests inject a manual clock to
/// simulate expiry without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default clock backed by `Instant::now()`.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// One cached value. Never mutated after insertion; replaced wholesale on
/// refresh.
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Generic TTL cache from a composite string key to an already-computed value,
/// shared by all concurrent callers within one process lifetime.
///
/// `get`/`set`/`invalidate` are safe to call from many request-handling tasks
/// without external locking. Concurrent misses for the same key may both
/// recompute; the merge they cache is deterministic, so last-write-wins is
/// harmless.
pub struct LayeredCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> LayeredCache<V> {
    /// Create a cache using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a cache with an injected clock (used by tests to drive expiry).
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    // A poisoned lock means some writer panicked mid-operation; the map itself
    // is still structurally sound, and dropping the cache on the floor would
    // fail requests that have a perfectly good recompute path.
    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a key. Returns `None` when the key was never stored or its TTL
    /// has elapsed; expired entries are evicted eagerly on lookup.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        {
            let entries = self.read_entries();
            match entries.get(key) {
                Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: evict lazily under the write lock. Re-check, since another
        // task may have refreshed the entry between the two locks.
        let mut entries = self.write_entries();
        if let Some(entry) = entries.get(key) {
            if now < entry.expires_at {
                return Some(entry.value.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// Store a value, unconditionally replacing any existing entry for `key`.
    ///
    /// A TTL large enough to overflow `Instant` is clamped to roughly a year;
    /// an absurd operator-supplied TTL must not panic a request path.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        const TTL_CLAMP: Duration = Duration::from_secs(365 * 24 * 60 * 60);
        let now = self.clock.now();
        let expires_at = now.checked_add(ttl).unwrap_or_else(|| now + TTL_CLAMP);
        let mut entries = self.write_entries();
        entries.insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Remove one exact key. Returns whether an entry was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.write_entries().remove(key).is_some()
    }

    /// Remove every key sharing `prefix`. Returns the number of entries
    /// removed. Used to bust all cached merges for one tenant without
    /// enumerating locales.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.write_entries();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Number of entries currently held, including not-yet-evicted expired ones.
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }
}

impl<V: Clone> Default for LayeredCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Test clock that only moves when told to.
    struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }

    fn ttl(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }

    // ==================== Get / Set Tests ====================

    #[test]
    fn test_get_missing_key_is_miss() {
        let cache: LayeredCache<String> = LayeredCache::new();
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn test_set_then_get_within_ttl() {
        let cache = LayeredCache::new();
        cache.set("k", "v".to_string(), ttl(60));
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_set_overwrites_existing_entry() {
        let cache = LayeredCache::new();
        cache.set("k", "old".to_string(), ttl(60));
        cache.set("k", "new".to_string(), ttl(60));
        assert_eq!(cache.get("k"), Some("new".to_string()));
        assert_eq!(cache.len(), 1);
    }

    // ==================== Expiry Tests ====================

    #[test]
    fn test_entry_expires_after_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = LayeredCache::with_clock(clock.clone());

        cache.set("k", "v".to_string(), ttl(120));
        assert_eq!(cache.get("k"), Some("v".to_string()));

        clock.advance(ttl(121));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        // now >= expires_at is a miss, per the TTL contract.
        let clock = Arc::new(ManualClock::new());
        let cache = LayeredCache::with_clock(clock.clone());

        cache.set("k", "v".to_string(), ttl(120));
        clock.advance(ttl(120));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_lookup() {
        let clock = Arc::new(ManualClock::new());
        let cache = LayeredCache::with_clock(clock.clone());

        cache.set("k", "v".to_string(), ttl(1));
        clock.advance(ttl(2));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_absurd_ttl_does_not_panic() {
        let cache = LayeredCache::new();
        cache.set("k", "v".to_string(), Duration::from_secs(u64::MAX));
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_refresh_after_expiry() {
        let clock = Arc::new(ManualClock::new());
        let cache = LayeredCache::with_clock(clock.clone());

        cache.set("k", "stale".to_string(), ttl(10));
        clock.advance(ttl(11));
        cache.set("k", "fresh".to_string(), ttl(10));
        assert_eq!(cache.get("k"), Some("fresh".to_string()));
    }

    // ==================== Invalidation Tests ====================

    #[test]
    fn test_invalidate_exact_key() {
        let cache = LayeredCache::new();
        cache.set("a:en", 1u32, ttl(60));
        cache.set("a:es", 2u32, ttl(60));

        assert!(cache.invalidate("a:en"));
        assert_eq!(cache.get("a:en"), None);
        assert_eq!(cache.get("a:es"), Some(2));
    }

    #[test]
    fn test_invalidate_missing_key_returns_false() {
        let cache: LayeredCache<u32> = LayeredCache::new();
        assert!(!cache.invalidate("nope"));
    }

    #[test]
    fn test_invalidate_prefix_removes_all_matching() {
        let cache = LayeredCache::new();
        cache.set("site:tenant-a:en", 1u32, ttl(60));
        cache.set("site:tenant-a:es", 2u32, ttl(60));
        cache.set("site:tenant-b:en", 3u32, ttl(60));

        let removed = cache.invalidate_prefix("site:tenant-a:");
        assert_eq!(removed, 2);
        assert_eq!(cache.get("site:tenant-a:en"), None);
        assert_eq!(cache.get("site:tenant-a:es"), None);
        assert_eq!(cache.get("site:tenant-b:en"), Some(3));
    }

    #[test]
    fn test_invalidate_prefix_no_match_removes_nothing() {
        let cache = LayeredCache::new();
        cache.set("site:tenant-a:en", 1u32, ttl(60));
        assert_eq!(cache.invalidate_prefix("site:tenant-z:"), 0);
        assert_eq!(cache.len(), 1);
    }

    // ==================== Concurrency Tests ====================

    #[test]
    fn test_concurrent_get_set_from_many_threads() {
        let cache: Arc<LayeredCache<usize>> = Arc::new(LayeredCache::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}", j % 10);
                    cache.set(&key, i * 1000 + j, ttl(60));
                    let _ = cache.get(&key);
                }
            }));
        }

        for handle in handles {
            handle.join().expect("thread should not panic");
        }

        // Every surviving value must be one that some thread actually wrote.
        for j in 0..10 {
            let value = cache.get(&format!("key-{}", j));
            assert!(value.is_some());
        }
    }

    #[test]
    fn test_concurrent_invalidate_prefix_is_safe() {
        let cache: Arc<LayeredCache<u32>> = Arc::new(LayeredCache::new());
        for i in 0..50 {
            cache.set(format!("t:{}", i), i, ttl(60));
        }

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..50 {
                    cache.set(format!("t:{}", i), i + 100, ttl(60));
                }
            })
        };
        let invalidator = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                cache.invalidate_prefix("t:");
            })
        };

        writer.join().expect("writer should not panic");
        invalidator.join().expect("invalidator should not panic");
    }
}
