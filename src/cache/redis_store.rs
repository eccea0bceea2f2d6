// src/cache/redis_store.rs
//! Redis-backed persistent cache store. TTLs are enforced by Redis itself
//! via `SETEX`, so a read never returns an expired entry.

use super::{CacheEntry, CacheKind, CacheStore};
use crate::error::FetchError;
use anyhow::{anyhow, Result as AnyhowResult};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use redis::{aio::ConnectionManager, AsyncCommands};
use std::fmt;
use std::time::Duration;

const KEY_PREFIX: &str = "netcache";

/// Uses a `ConnectionManager` for automatic reconnection.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn_manager: ConnectionManager,
    redis_url: String,
}

impl fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("redis_url", &self.redis_url)
            .field("conn_manager", &"<ConnectionManager instance>")
            .finish()
    }
}

impl RedisCacheStore {
    pub async fn new(redis_url: &str) -> AnyhowResult<Self> {
        info!("Initializing Redis connection manager for URL: {}", redis_url);
        let client = redis::Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to create Redis ConnectionManager: {}", e);
            anyhow!("Failed to create Redis ConnectionManager: {}", e)
        })?;
        info!("Redis ConnectionManager initialized successfully.");
        Ok(Self {
            conn_manager,
            redis_url: redis_url.to_string(),
        })
    }

    fn generate_key(key: &str) -> String {
        format!("{}:{}", KEY_PREFIX, key)
    }

    /// Redis rejects `SETEX` with a zero expiry.
    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, FetchError> {
        let key = Self::generate_key(key);
        debug!("Attempting to GET cache for key: {}", key);

        let mut conn = self.conn_manager.clone();
        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(value_str)) => match serde_json::from_str::<CacheEntry>(&value_str) {
                Ok(entry) => {
                    debug!("Cache HIT for key: {} ({})", key, entry.kind);
                    Ok(Some(entry.payload))
                }
                Err(e) => {
                    warn!("Failed to deserialize cached entry for key {}: {}", key, e);
                    Err(FetchError::Cache(format!(
                        "Cache deserialization error for key {}: {}",
                        key, e
                    )))
                }
            },
            Ok(None) => {
                debug!("Cache MISS for key: {}", key);
                Ok(None)
            }
            Err(e) => {
                error!("Redis GET error for key {}: {}", key, e);
                Err(e.into())
            }
        }
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
        let key = Self::generate_key(key);
        let entry = CacheEntry {
            payload: value.to_string(),
            kind,
        };
        let value_str = serde_json::to_string(&entry)?;
        let ttl_to_use = Self::ttl_secs(ttl);

        let mut conn = self.conn_manager.clone();
        match conn.set_ex::<_, _, ()>(&key, value_str, ttl_to_use).await {
            Ok(_) => {
                debug!("Cache SETEX success for key: {} with TTL: {}s", key, ttl_to_use);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to SETEX key '{}' in Redis: {}", key, e);
                Err(e.into())
            }
        }
    }
}
