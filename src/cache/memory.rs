//! In-process TTL store, used when no Redis URL is configured and in tests.

use super::{CacheEntry, CacheKind, CacheStore};
use crate::error::FetchError;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: CacheEntry,
    cached_at: Instant,
    ttl: Duration,
}

impl StoredEntry {
    fn is_valid(&self) -> bool {
        self.cached_at.elapsed() < self.ttl
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

impl StoreMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, StoredEntry>,
    metrics: StoreMetrics,
}

#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    state: Mutex<StoreState>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full entry (payload and kind) if present and fresh.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        let state = self.state.lock().await;
        state
            .entries
            .get(key)
            .filter(|stored| stored.is_valid())
            .map(|stored| stored.entry.clone())
    }

    pub async fn metrics(&self) -> StoreMetrics {
        self.state.lock().await.metrics
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, FetchError> {
        let mut state = self.state.lock().await;

        let fresh = state
            .entries
            .get(key)
            .filter(|stored| stored.is_valid())
            .map(|stored| stored.entry.payload.clone());
        if fresh.is_none() && state.entries.remove(key).is_some() {
            debug!("Cache entry expired for key: {}", key);
        }

        if fresh.is_some() {
            state.metrics.hits += 1;
            debug!("Cache HIT for key: {}", key);
        } else {
            state.metrics.misses += 1;
            debug!("Cache MISS for key: {}", key);
        }
        Ok(fresh)
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        kind: CacheKind,
    ) -> Result<(), FetchError> {
        if key.is_empty() {
            return Err(FetchError::EmptyUrl);
        }
        let mut state = self.state.lock().await;
        state.entries.insert(
            key.to_string(),
            StoredEntry {
                entry: CacheEntry {
                    payload: value.to_string(),
                    kind,
                },
                cached_at: Instant::now(),
                ttl,
            },
        );
        state.metrics.writes += 1;
        debug!("Cached {} entry for key: {} (TTL: {:?})", kind, key, ttl);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_retrieve() {
        let store = MemoryCacheStore::new();
        store
            .put("https://a/data.json", "{\"a\":1}", Duration::from_secs(600), CacheKind::Data)
            .await
            .unwrap();

        assert_eq!(
            store.get("https://a/data.json").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        let entry = store.entry("https://a/data.json").await.unwrap();
        assert_eq!(entry.kind, CacheKind::Data);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let store = MemoryCacheStore::new();
        store
            .put("k", "v", Duration::from_millis(20), CacheKind::Data)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_metrics_track_hits_and_misses() {
        let store = MemoryCacheStore::new();
        store.get("k").await.unwrap();
        store
            .put("k", "v", Duration::from_secs(60), CacheKind::Image)
            .await
            .unwrap();
        store.get("k").await.unwrap();

        let metrics = store.metrics().await;
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.writes, 1);
        assert_eq!(metrics.hit_rate(), 0.5);
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let store = MemoryCacheStore::new();
        let err = store
            .put("", "v", Duration::from_secs(60), CacheKind::Data)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::EmptyUrl);
    }
}
