//! Bounded LRU cache with absolute per-entry TTL.
//!
//! Recency order and eviction come from [`lru::LruCache`]; this wrapper adds
//! the TTL check, hit/miss/eviction counters and a clock seam for tests.
//!
//! TTL is measured from insertion (`created_at_ms`) and is independent of
//! recency: reading an entry keeps it from being evicted, but does not extend
//! its lifetime.

use std::hash::Hash;
use std::num::NonZeroUsize;

use guia_timing::ClockRef;
use serde::Serialize;

/// Default maximum number of entries.
pub const DEFAULT_CAPACITY: usize = 50;

/// Default entry lifetime in milliseconds (5 minutes).
pub const DEFAULT_TTL_MS: i64 = 300_000;

/// Value plus bookkeeping timestamps.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at_ms: i64,
    pub last_accessed_ms: i64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) > ttl_ms
    }
}

/// Counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries removed to make room for a new key.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
}

pub struct LruCache<K, V> {
    entries: lru::LruCache<K, CacheEntry<V>>,
    ttl_ms: i64,
    clock: ClockRef,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache holding at most `capacity` entries (minimum 1), each
    /// living at most `ttl_ms` milliseconds.
    pub fn new(capacity: usize, ttl_ms: i64, clock: ClockRef) -> Self {
        Self {
            entries: lru::LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            ttl_ms,
            clock,
            stats: CacheStats::default(),
        }
    }

    /// Return the value for `key` and mark it most recently used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let now = self.clock.now_ms();
        let expired = match self.entries.peek(key) {
            Some(entry) => entry.is_expired(now, self.ttl_ms),
            None => {
                self.stats.misses += 1;
                return None;
            }
        };

        if expired {
            self.entries.pop(key);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            return None;
        }

        self.stats.hits += 1;
        let entry = self.entries.get_mut(key)?;
        entry.last_accessed_ms = now;
        Some(&entry.value)
    }

    /// Look at a live entry without touching recency or stats.
    pub fn peek(&self, key: &K) -> Option<&CacheEntry<V>> {
        let now = self.clock.now_ms();
        self.entries
            .peek(key)
            .filter(|entry| !entry.is_expired(now, self.ttl_ms))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    /// Store `value` under `key` with fresh timestamps.
    ///
    /// Replacing an existing key never evicts. Inserting a new key into a full
    /// cache first evicts the least recently used entry, whose key is returned.
    pub fn set(&mut self, key: K, value: V) -> Option<K> {
        let now = self.clock.now_ms();
        let entry = CacheEntry {
            value,
            created_at_ms: now,
            last_accessed_ms: now,
        };

        let replacing = self.entries.contains(&key);
        match self.entries.push(key, entry) {
            Some((evicted, _)) if !replacing => {
                self.stats.evictions += 1;
                tracing::debug!(
                    capacity = self.capacity(),
                    "cache full, evicted least recently used entry"
                );
                Some(evicted)
            }
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.pop(key).map(|entry| entry.value)
    }

    /// Remove every entry past its TTL. Returns how many were removed.
    pub fn clean_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, self.ttl_ms))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.pop(key);
        }

        let removed = expired.len();
        if removed > 0 {
            self.stats.expirations += removed as u64;
            tracing::debug!(removed, remaining = self.entries.len(), "cache expiry sweep");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including any not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }
}

impl<K, V> std::fmt::Debug for LruCache<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.entries.cap())
            .field("ttl_ms", &self.ttl_ms)
            .field("stats", &self.stats)
            .finish()
    }
}
