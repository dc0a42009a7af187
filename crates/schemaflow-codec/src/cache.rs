//! Bounded schema cache
//!
//! Maps schema ID to its parsed definition so the decode path does not hit the
//! registry for every record. Entries are advisory: the registry stays the
//! source of truth, and an ID the registry no longer knows is evicted.
//!
//! ## Architecture
//!
//! ```text
//! envelope schema_id
//!        │
//!        ▼
//! ┌──────────────────┐   miss   ┌──────────────────┐
//! │   SchemaCache    │ ───────► │ registry GET     │
//! │ id → ParsedSchema│ ◄─────── │ /schemas/ids/{id}│
//! └──────────────────┘  insert  └──────────────────┘
//! ```

use crate::avro::ParsedSchema;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default number of schemas kept
pub const DEFAULT_CACHE_CAPACITY: usize = 1_000;

/// Counters for the schema cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

/// LRU cache of parsed schemas keyed by registry ID.
pub struct SchemaCache {
    cache: RwLock<LruCache<u32, Arc<ParsedSchema>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl SchemaCache {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(cap)),
            capacity: cap.get(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, id: u32) -> Option<Arc<ParsedSchema>> {
        // `get` promotes the entry, so it needs the write lock.
        let mut cache = self.cache.write().await;
        match cache.get(&id) {
            Some(schema) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(schema))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn insert(&self, id: u32, schema: Arc<ParsedSchema>) {
        self.cache.write().await.put(id, schema);
    }

    /// Drop `id`; returns whether it was cached.
    pub async fn invalidate(&self, id: u32) -> bool {
        let removed = self.cache.write().await.pop(&id).is_some();
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(schema_id = id, "Evicted schema from cache");
        }
        removed
    }

    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let cache = self.cache.read().await;
        CacheStats {
            entries: cache.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(name: &str) -> Arc<ParsedSchema> {
        Arc::new(
            ParsedSchema::parse(&format!(
                r#"{{"type":"record","name":"{}","fields":[{{"name":"a","type":"int"}}]}}"#,
                name
            ))
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_hits_and_misses() {
        let cache = SchemaCache::new(4);
        assert!(cache.get(1).await.is_none());
        cache.insert(1, schema("A")).await;
        assert!(cache.get(1).await.is_some());

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_evicts_least_recently_used() {
        let cache = SchemaCache::new(2);
        cache.insert(1, schema("A")).await;
        cache.insert(2, schema("B")).await;
        // Touch 1 so 2 becomes the eviction candidate.
        cache.get(1).await;
        cache.insert(3, schema("C")).await;

        assert!(cache.get(1).await.is_some());
        assert!(cache.get(2).await.is_none());
        assert!(cache.get(3).await.is_some());
        assert_eq!(cache.stats().await.entries, 2);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = SchemaCache::new(2);
        cache.insert(9, schema("A")).await;
        assert!(cache.invalidate(9).await);
        assert!(!cache.invalidate(9).await);
        assert!(cache.get(9).await.is_none());
        assert_eq!(cache.stats().await.invalidations, 1);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let cache = SchemaCache::new(0);
        assert_eq!(cache.stats().await.capacity, 1);
    }
}
