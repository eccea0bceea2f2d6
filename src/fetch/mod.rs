//! Cache-aside fetch orchestration for strings and JSON.
//!
//! connectivity check → cache lookup (unless forced) → network fetch →
//! write-through. Every public operation comes in two flavours: `try_*`
//! returns a [`FetchError`], the plain form collapses any failure into `None`
//! after logging it.

use crate::cache::{CacheKind, CacheStore};
use crate::error::{FetchError, Result};
use crate::net::{Connectivity, Transport};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub type JsonObject = Map<String, Value>;
pub type JsonArray = Vec<Value>;

/// Converts a failed operation into `None`, logging it with its context.
pub(crate) fn absent_on_error<T>(operation: &str, url: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e @ (FetchError::Offline | FetchError::EmptyUrl)) => {
            debug!("{} skipped for '{}': {}", operation, url, e);
            None
        }
        Err(e) => {
            warn!("{} failed for '{}': {}", operation, url, e);
            None
        }
    }
}

#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CacheStore>,
    connectivity: Connectivity,
    request_timeout: Duration,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("connectivity", &self.connectivity)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CacheStore>,
        connectivity: Connectivity,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            store,
            connectivity,
            request_timeout,
        }
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// One GET through the transport, guarded by the URL and connectivity
    /// pre-checks. Never touches the cache.
    pub async fn try_fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        if url.trim().is_empty() {
            return Err(FetchError::EmptyUrl);
        }
        // Fetching makes no sense without a network.
        if !self.connectivity.is_connected() {
            return Err(FetchError::Offline);
        }
        self.transport.get(url, self.request_timeout).await
    }

    pub async fn try_fetch_string_raw(&self, url: &str) -> Result<String> {
        let body = self.try_fetch_bytes(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn fetch_string_raw(&self, url: &str) -> Option<String> {
        absent_on_error("fetch_string_raw", url, self.try_fetch_string_raw(url).await)
    }

    pub async fn try_fetch_string_cached(
        &self,
        url: &str,
        ttl: Duration,
        force: bool,
    ) -> Result<String> {
        if url.trim().is_empty() {
            return Err(FetchError::EmptyUrl);
        }

        if !force {
            if let Some(content) = self.cache_lookup(url).await {
                return Ok(content);
            }
        }

        let content = self.try_fetch_string_raw(url).await?;
        self.cache_register(url, &content, ttl, CacheKind::Data).await;
        Ok(content)
    }

    pub async fn fetch_string_cached(&self, url: &str, ttl: Duration, force: bool) -> Option<String> {
        absent_on_error(
            "fetch_string_cached",
            url,
            self.try_fetch_string_cached(url, ttl, force).await,
        )
    }

    /// Uncached JSON object download.
    pub async fn try_fetch_json_object(&self, url: &str) -> Result<JsonObject> {
        let data = self.try_fetch_string_raw(url).await?;
        debug!("fetch_json_object {}", data);
        parse_object(&data)
    }

    pub async fn fetch_json_object(&self, url: &str) -> Option<JsonObject> {
        absent_on_error("fetch_json_object", url, self.try_fetch_json_object(url).await)
    }

    /// A body that fails to parse stays cached; only this call's result is
    /// affected.
    pub async fn try_fetch_json_object_cached(
        &self,
        url: &str,
        ttl: Duration,
        force: bool,
    ) -> Result<JsonObject> {
        let data = self.try_fetch_string_cached(url, ttl, force).await?;
        parse_object(&data)
    }

    pub async fn fetch_json_object_cached(
        &self,
        url: &str,
        ttl: Duration,
        force: bool,
    ) -> Option<JsonObject> {
        absent_on_error(
            "fetch_json_object_cached",
            url,
            self.try_fetch_json_object_cached(url, ttl, force).await,
        )
    }

    pub async fn try_fetch_json_array_cached(
        &self,
        url: &str,
        ttl: Duration,
        force: bool,
    ) -> Result<JsonArray> {
        let data = self.try_fetch_string_cached(url, ttl, force).await?;
        match serde_json::from_str::<Value>(&data)? {
            Value::Array(items) => Ok(items),
            other => Err(FetchError::Parse(format!(
                "expected a JSON array, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub async fn fetch_json_array_cached(
        &self,
        url: &str,
        ttl: Duration,
        force: bool,
    ) -> Option<JsonArray> {
        absent_on_error(
            "fetch_json_array_cached",
            url,
            self.try_fetch_json_array_cached(url, ttl, force).await,
        )
    }

    /// Typed variant of the cached JSON fetchers.
    pub async fn try_fetch_json_cached<T: DeserializeOwned>(
        &self,
        url: &str,
        ttl: Duration,
        force: bool,
    ) -> Result<T> {
        let data = self.try_fetch_string_cached(url, ttl, force).await?;
        Ok(serde_json::from_str(&data)?)
    }

    pub async fn fetch_json_cached<T: DeserializeOwned>(
        &self,
        url: &str,
        ttl: Duration,
        force: bool,
    ) -> Option<T> {
        absent_on_error(
            "fetch_json_cached",
            url,
            self.try_fetch_json_cached(url, ttl, force).await,
        )
    }

    /// Store read; a failing store is treated as a miss.
    pub(crate) async fn cache_lookup(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Cache lookup failed for '{}', treating as miss: {}", key, e);
                None
            }
        }
    }

    /// Store write; a failing store does not fail the fetch that produced the value.
    pub(crate) async fn cache_register(&self, key: &str, value: &str, ttl: Duration, kind: CacheKind) {
        if let Err(e) = self.store.put(key, value, ttl, kind).await {
            warn!("Failed to cache {} entry for '{}': {}", kind, key, e);
        }
    }
}

fn parse_object(data: &str) -> Result<JsonObject> {
    match serde_json::from_str::<Value>(data)? {
        Value::Object(map) => Ok(map),
        other => Err(FetchError::Parse(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
