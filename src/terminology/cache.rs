//! In-memory LRU cache for interactive search results, with TTL.
//! Key: blake3 hash of (generation | exact | normalized phrase), so a reload
//! makes every older entry unreachable without an explicit flush.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use super::TerminologyEntry;

type CacheKey = [u8; 32];

struct CachedHits {
    hits: Arc<[TerminologyEntry]>,
    inserted_at: Instant,
}

pub struct SearchCache {
    inner: Mutex<LruCache<CacheKey, CachedHits>>,
    ttl: Duration,
}

impl SearchCache {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    pub fn compute_key(generation: u64, exact: bool, phrase: &str) -> CacheKey {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&generation.to_le_bytes());
        hasher.update(b"|");
        hasher.update(&[exact as u8]);
        hasher.update(b"|");
        hasher.update(phrase.as_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Cached hits, or None if absent or expired.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<[TerminologyEntry]>> {
        let mut cache = self.inner.lock();
        if let Some(entry) = cache.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(Arc::clone(&entry.hits));
            }
            cache.pop(key);
        }
        None
    }

    pub fn insert(&self, key: CacheKey, hits: Arc<[TerminologyEntry]>) {
        self.inner.lock().put(
            key,
            CachedHits {
                hits,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
