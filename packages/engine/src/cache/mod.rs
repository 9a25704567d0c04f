//! Bounded key/value cache with LRU, TTL, and size-based eviction.
//!
//! [`CacheStore`] enforces three independent limits: entry count
//! (`max_entries`), resident size (`max_size`, measured by a pluggable size
//! function), and age (`ttl_ms`, per entry, with an optional store-wide
//! default). Recency is tracked by an [`lru::LruCache`] under a mutex;
//! expired entries are removed lazily on access.
//!
//! Entry lifecycle: `absent → live → {expired | evicted} → absent`.

mod adapter;

pub use adapter::CacheAdapter;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use manifold_core::Value;

/// Sizing and expiry limits for a [`CacheStore`].
///
/// A zero limit disables that limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum live entries; least-recently-used entries evict beyond it.
    pub max_entries: usize,
    /// Maximum total resident size in size-function units.
    pub max_size: u64,
    /// Default time-to-live in milliseconds for entries inserted without one.
    pub ttl_ms: u64,
    /// When true, expired entries are still returned (and kept) by `get`.
    pub allow_stale: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            max_size: 1_048_576,
            ttl_ms: 0,
            allow_stale: false,
        }
    }
}

/// Hit/miss/eviction counters for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub resident_size: u64,
}

type SizeFn = Box<dyn Fn(&str, &Value) -> u64 + Send + Sync>;

struct Entry {
    value: Value,
    inserted_at: Instant,
    ttl_ms: u64,
    size: u64,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.ttl_ms > 0 && self.inserted_at.elapsed() > Duration::from_millis(self.ttl_ms)
    }
}

struct Inner {
    entries: LruCache<String, Entry>,
    resident_size: u64,
}

/// Concurrent LRU + TTL + size cache over [`Value`] payloads.
pub struct CacheStore {
    config: CacheConfig,
    size_fn: SizeFn,
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStore {
    /// Creates a store sized by [`Value::estimated_size`].
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self::with_size_fn(config, Box::new(|key, value| key.len() as u64 + value.estimated_size()))
    }

    /// Creates a store with a custom entry size function.
    #[must_use]
    pub fn with_size_fn(config: CacheConfig, size_fn: SizeFn) -> Self {
        Self {
            config,
            size_fn,
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                resident_size: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Inserts or overwrites `key` with the store-default TTL.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.set_with_ttl(key, value, None);
    }

    /// Inserts or overwrites `key`, optionally overriding the TTL.
    ///
    /// Evicts least-recently-used entries until both the count and size
    /// limits hold. An entry larger than `max_size` on its own does not stay
    /// resident.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: Value, ttl_ms: Option<u64>) {
        let key = key.into();
        let size = (self.size_fn)(&key, &value);
        let entry = Entry {
            value,
            inserted_at: Instant::now(),
            ttl_ms: ttl_ms.unwrap_or(self.config.ttl_ms),
            size,
        };

        let mut inner = self.inner.lock();
        if let Some(previous) = inner.entries.put(key, entry) {
            inner.resident_size -= previous.size;
        }
        inner.resident_size += size;
        self.evict_over_limit(&mut inner);
    }

    /// Returns the live value for `key`, refreshing its recency.
    ///
    /// An expired entry is removed and reported as a miss unless
    /// `allow_stale` is set.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock();

        let expired = inner
            .entries
            .peek(key)
            .is_some_and(|entry| entry.is_expired() && !self.config.allow_stale);
        if expired {
            if let Some(entry) = inner.entries.pop(key) {
                inner.resident_size -= entry.size;
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        match inner.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Removes `key`, returning its value if it was live.
    pub fn delete(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock();
        inner.entries.pop(key).map(|entry| {
            inner.resident_size -= entry.size;
            entry.value
        })
    }

    /// Removes every entry whose key starts with `prefix`, returning the
    /// count removed.
    pub fn purge_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock();
        let doomed: Vec<String> = inner
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            if let Some(entry) = inner.entries.pop(key) {
                inner.resident_size -= entry.size;
            }
        }
        doomed.len()
    }

    /// Removes all entries and resets the counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.resident_size = 0;
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    /// Number of resident entries (including not-yet-collected expired ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters and residency.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: inner.entries.len(),
            resident_size: inner.resident_size,
        }
    }

    fn evict_over_limit(&self, inner: &mut Inner) {
        let over = |inner: &Inner| {
            (self.config.max_entries > 0 && inner.entries.len() > self.config.max_entries)
                || (self.config.max_size > 0 && inner.resident_size > self.config.max_size)
        };
        while over(inner) {
            match inner.entries.pop_lru() {
                Some((_, entry)) => {
                    inner.resident_size -= entry.size;
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
