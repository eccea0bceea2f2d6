//! Persistent cache store seam: a TTL-aware key/value store keyed by URL or a
//! logical name. Values are inline strings (`Data`) or file paths (`Image`).

pub mod memory;
pub mod redis_store;

pub use memory::MemoryCacheStore;
pub use redis_store::RedisCacheStore;

use crate::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKind {
    Data,
    Image,
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Data => write!(f, "DATA"),
            CacheKind::Image => write!(f, "IMAGE"),
        }
    }
}

/// What the store keeps under a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: String,
    pub kind: CacheKind,
}

/// Implementations own freshness: `get` must never return an expired entry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, FetchError>;

    async fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        kind: CacheKind,
    ) -> Result<(), FetchError>;
}
