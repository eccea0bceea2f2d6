//! Scriptable fakes for the transport, decoder, map builder and display targets.

use crate::error::FetchError;
use crate::images::{Bitmap, DisplayTarget, ImageDecoder, MapPayloadBuilder, TargetId};
use crate::net::Transport;
use async_trait::async_trait;
use image::DynamicImage;
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
struct MockResponse {
    result: Result<Vec<u8>, FetchError>,
    latency: Duration,
}

/// Transport answering from a per-URL script and counting every call.
/// Unscripted URLs answer 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, MockResponse>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_ok(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.script(url, Ok(body.into()), Duration::ZERO);
    }

    pub fn respond_delayed(&self, url: &str, body: impl Into<Vec<u8>>, latency: Duration) {
        self.script(url, Ok(body.into()), latency);
    }

    pub fn respond_error(&self, url: &str, error: FetchError) {
        self.script(url, Err(error), Duration::ZERO);
    }

    fn script(&self, url: &str, result: Result<Vec<u8>, FetchError>, latency: Duration) {
        lock(&self.routes).insert(url.to_string(), MockResponse { result, latency });
    }

    pub fn calls(&self, url: &str) -> usize {
        lock(&self.calls).get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
        *lock(&self.calls).entry(url.to_string()).or_insert(0) += 1;
        let response = lock(&self.routes).get(url).cloned();

        match response {
            Some(response) => {
                if !response.latency.is_zero() {
                    tokio::time::sleep(response.latency).await;
                }
                debug!("MockTransport answered {}", url);
                response.result
            }
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

/// Decodes bodies of the form `WxH` (e.g. `b"2x3"`) into a blank bitmap of
/// that size; anything else is a decode error.
#[derive(Debug, Default, Clone, Copy)]
pub struct DimensionDecoder;

impl ImageDecoder for DimensionDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Bitmap, FetchError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| FetchError::Decode(format!("not utf-8: {}", e)))?;
        let (w, h) = text
            .trim()
            .split_once('x')
            .ok_or_else(|| FetchError::Decode(format!("bad dimensions '{}'", text)))?;
        let width: u32 = w
            .parse()
            .map_err(|_| FetchError::Decode(format!("bad width '{}'", w)))?;
        let height: u32 = h
            .parse()
            .map_err(|_| FetchError::Decode(format!("bad height '{}'", h)))?;
        Ok(Bitmap::new(DynamicImage::new_rgba8(width, height)))
    }
}

/// Map builder returning a fixed payload (or nothing) and counting calls.
#[derive(Debug, Default)]
pub struct FixedMapBuilder {
    payload: Option<String>,
    calls: AtomicUsize,
}

impl FixedMapBuilder {
    pub fn new(payload: Option<String>) -> Self {
        Self {
            payload,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MapPayloadBuilder for FixedMapBuilder {
    async fn map_with_location(&self, _longitude: f64, _latitude: f64) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload.clone()
    }
}

/// Display target remembering everything it was asked to show.
#[derive(Debug)]
pub struct RecordingTarget {
    id: TargetId,
    history: Mutex<Vec<Option<Bitmap>>>,
}

impl RecordingTarget {
    pub fn new(id: TargetId) -> Self {
        Self {
            id,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn current(&self) -> Option<Bitmap> {
        lock(&self.history).last().cloned().flatten()
    }

    /// Number of `set_bitmap` calls, placeholders included.
    pub fn updates(&self) -> usize {
        lock(&self.history).len()
    }
}

impl DisplayTarget for RecordingTarget {
    fn id(&self) -> TargetId {
        self.id
    }

    fn set_bitmap(&self, bitmap: Option<Bitmap>) {
        lock(&self.history).push(bitmap);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
