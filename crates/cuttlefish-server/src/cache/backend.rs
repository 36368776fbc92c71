//! DashMap-backed cache storage with TTL expiry.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cached entry with TTL support.
///
/// The data is wrapped in `Arc` so cache hits hand out cheap clones.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    /// Create a new cached entry.
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Local cache backend shared by every typed cache in the process.
#[derive(Clone, Debug, Default)]
pub struct CacheBackend {
    map: Arc<DashMap<String, CachedEntry>>,
}

impl CacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value from the cache. Expired entries are dropped and read as misses.
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        let entry = self.map.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.map.remove(key);
            tracing::debug!(key = %key, "cache entry expired");
            return None;
        }
        Some(Arc::clone(&entry.data))
    }

    /// Set a value in the cache with TTL, replacing any previous entry.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        self.map.insert(key.to_string(), CachedEntry::new(value, ttl));
        tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache set");
    }

    /// Invalidate a cache entry.
    pub async fn invalidate(&self, key: &str) {
        self.map.remove(key);
        tracing::debug!(key = %key, "cache invalidated");
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.map.len(),
            mode: "local".to_string(),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub mode: String,
}
