//! Volatile TTL cache for composite upstream results.
//!
//! Entries carry an absolute expiry computed at write time. Expired entries
//! are dropped lazily on `get`; there is no background sweep. Storage is a
//! `DashMap`, so concurrent `set` calls for the same key are last-writer-wins
//! without lost updates to other keys.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

/// A cached value with its expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub expires_at: Instant,
    pub value: V,
}

/// In-memory cache keyed by request parameters.
///
/// Created once per process by the service layer and dropped at shutdown.
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry, evicting it if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        // Guard dropped above; removal re-checks expiry in case a fresh
        // value landed in between.
        if self
            .entries
            .remove_if(key, |_, entry| entry.expires_at <= now)
            .is_some()
        {
            debug!("Cache entry expired: {}", key);
        }
        None
    }

    /// Store a value, replacing any existing entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            expires_at: Instant::now() + self.ttl,
            value,
        };
        self.entries.insert(key.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("player:steam:alice", 42u32);

        assert_eq!(cache.get("player:steam:alice"), Some(42));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_miss_for_unknown_key() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get("nothing"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = TtlCache::new(Duration::from_millis(20));
        cache.set("seasons:steam", vec!["s1".to_string()]);

        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.get("seasons:steam"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_overwrites_and_refreshes_expiry() {
        let cache = TtlCache::new(Duration::from_millis(50));
        cache.set("k", 1);
        std::thread::sleep(Duration::from_millis(30));
        cache.set("k", 2);
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.set("k", "v");
        assert_eq!(cache.get("k"), None);
    }
}
