//! Bounded LRU cache for text→vector lookups.

use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Cache keys are the SHA-256 of the text, not the raw text, to bound memory
/// on long inputs.
type CacheKey = [u8; 32];

/// Memoizes embedding lookups with least-recently-used eviction.
///
/// Multiple in-flight retrieval calls share one cache instance; all recency
/// bookkeeping happens inside a single critical section per operation. This
/// is the only structure mutated during concurrent query execution.
pub struct EmbeddingCache {
    inner: Mutex<LruCache<CacheKey, Vec<f32>>>,
}

impl EmbeddingCache {
    /// Default capacity when none is configured.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a cache bounded to `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Looks up the vector for a text, refreshing its recency on a hit.
    #[must_use]
    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = Self::key(text);
        let mut cache = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let hit = cache.get(&key).cloned();
        drop(cache);
        if hit.is_some() {
            metrics::counter!("embedding_cache_hits_total").increment(1);
        } else {
            metrics::counter!("embedding_cache_misses_total").increment(1);
        }
        hit
    }

    /// Stores the vector for a text, evicting the least recently used entry
    /// when full.
    pub fn put(&self, text: &str, vector: Vec<f32>) {
        let key = Self::key(text);
        let mut cache = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        cache.put(key, vector);
        drop(cache);
        metrics::counter!("embedding_cache_inserts_total").increment(1);
    }

    /// Current number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(text: &str) -> CacheKey {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.finalize().into()
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
