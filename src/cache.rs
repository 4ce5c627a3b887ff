//! In-process result cache.
//!
//! Entries are keyed by the requested content kind and the URL exactly as the
//! caller sent it, never the post-redirect URL. Nothing expires. The cache is
//! bounded twice: by entry count and by the summed weight of the stored values,
//! so a handful of large file bodies cannot crowd out memory. Two concurrent misses on the same key both
//! fetch and the later insert wins, which is harmless because both compute
//! the same value.

use lru::LruCache;
use std::{
    hash::Hash,
    num::NonZeroUsize,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::dispatcher::ContentKind;

pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(1024).unwrap();
pub const DEFAULT_MAX_BYTES: usize = 256 * 1024 * 1024; // 256MB

/// Approximate size in bytes of a cached value.
pub trait Weigh {
    fn weight(&self) -> usize;
}

impl Weigh for String {
    fn weight(&self) -> usize {
        self.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ContentKind,
    pub url: String,
}

impl CacheKey {
    pub fn new(kind: ContentKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
    pub bytes: usize,
    pub max_bytes: usize,
}

#[derive(Debug)]
struct Entries<K: Hash + Eq, V> {
    lru: LruCache<K, V>,
    bytes: usize,
}

/// Bounded least-recently-used cache shared between requests.
#[derive(Debug)]
pub struct ResultCache<K: Hash + Eq, V> {
    entries: Mutex<Entries<K, V>>,
    max_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq, V: Clone + Weigh> ResultCache<K, V> {
    pub fn new(capacity: NonZeroUsize, max_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(Entries {
                lru: LruCache::new(capacity),
                bytes: 0,
            }),
            max_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.lock().lru.get(key).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Stores `value`, evicting least recently used entries until both bounds
    /// hold again. A value heavier than the whole byte budget is not stored;
    /// returns whether the value was kept.
    pub fn insert(&self, key: K, value: V) -> bool {
        let weight = value.weight();
        if weight > self.max_bytes {
            return false;
        }

        let mut entries = self.lock();
        // push hands back either the replaced value or the evicted LRU entry
        if let Some((_, displaced)) = entries.lru.push(key, value) {
            entries.bytes = entries.bytes.saturating_sub(displaced.weight());
        }
        entries.bytes += weight;

        while entries.bytes > self.max_bytes {
            let Some((_, evicted)) = entries.lru.pop_lru() else {
                break;
            };
            entries.bytes = entries.bytes.saturating_sub(evicted.weight());
        }
        true
    }

    pub fn len(&self) -> usize {
        self.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.lru.len(),
            capacity: entries.lru.cap().get(),
            bytes: entries.bytes,
            max_bytes: self.max_bytes,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries<K, V>> {
        // The map is never left half-written, so a poisoned lock is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
