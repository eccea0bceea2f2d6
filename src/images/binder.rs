//! Asynchronous image binding for recyclable display targets.
//!
//! Each bind that misses the in-memory cache records `target → (url, ticket)`
//! in the pending registry and spawns one load. When the load finishes, the
//! target is only touched if the registry still holds that exact ticket, so a
//! slow load can never overwrite a target that has been rebound since, whether
//! or not the newer load has finished yet.
//!
//! Registry checks and target mutations for one target happen under that
//! target's registry entry lock. [`DisplayTarget::set_bitmap`] must therefore
//! not call back into the binder.

use super::decoder::Bitmap;
use super::pipeline::ImagePipeline;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type TargetId = u64;

/// A UI element that can show a bitmap (or nothing, while loading).
pub trait DisplayTarget: Send + Sync {
    /// Stable identity; a recycled element keeps its id.
    fn id(&self) -> TargetId;

    fn set_bitmap(&self, bitmap: Option<Bitmap>);
}

pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Hands completion work to the thread that owns the display targets.
pub trait UiDispatcher: Send + Sync {
    fn dispatch(&self, job: UiJob);
}

/// Runs completion work directly on the worker that finished the load.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn dispatch(&self, job: UiJob) {
        job();
    }
}

/// Queues completion work for a UI loop that drains a [`UiQueue`].
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<UiJob>,
}

impl ChannelDispatcher {
    pub fn new() -> (Self, UiQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UiQueue { rx })
    }
}

impl UiDispatcher for ChannelDispatcher {
    fn dispatch(&self, job: UiJob) {
        if self.tx.send(job).is_err() {
            debug!("UI queue closed, dropping completion");
        }
    }
}

pub struct UiQueue {
    rx: mpsc::UnboundedReceiver<UiJob>,
}

impl fmt::Debug for UiQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiQueue").finish_non_exhaustive()
    }
}

impl UiQueue {
    /// Runs every job queued so far; returns how many ran.
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Waits for the next job and runs it. `false` once all dispatchers are gone.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingLoad {
    url: String,
    ticket: u64,
}

/// Owns the in-memory bitmap cache and the pending-target registry. Build
/// one per process and share it; tests build a fresh one per case.
pub struct ImageBinder {
    pipeline: Arc<ImagePipeline>,
    bitmaps: Arc<DashMap<String, Bitmap>>,
    pending: Arc<DashMap<TargetId, PendingLoad>>,
    next_ticket: AtomicU64,
    dispatcher: Arc<dyn UiDispatcher>,
    runtime: Handle,
}

impl fmt::Debug for ImageBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBinder")
            .field("cached_bitmaps", &self.bitmaps.len())
            .field("pending_targets", &self.pending.len())
            .finish()
    }
}

impl ImageBinder {
    pub fn new(pipeline: Arc<ImagePipeline>, dispatcher: Arc<dyn UiDispatcher>, runtime: Handle) -> Self {
        Self {
            pipeline,
            bitmaps: Arc::new(DashMap::new()),
            pending: Arc::new(DashMap::new()),
            next_ticket: AtomicU64::new(0),
            dispatcher,
            runtime,
        }
    }

    pub fn pipeline(&self) -> &Arc<ImagePipeline> {
        &self.pipeline
    }

    /// Shows `url` on `target`. A memory-cache hit is applied synchronously and
    /// returns `None`; otherwise the target is cleared and the handle of the
    /// spawned load is returned. Loads are never cancelled.
    pub fn bind_image_async(&self, url: &str, target: Arc<dyn DisplayTarget>) -> Option<JoinHandle<()>> {
        let target_id = target.id();

        let cached = self.bitmaps.get(url).map(|entry| entry.value().clone());
        if let Some(bitmap) = cached {
            // Whatever this target was waiting on is superseded by the hit.
            let entry = self.pending.entry(target_id);
            target.set_bitmap(Some(bitmap));
            if let Entry::Occupied(pending) = entry {
                pending.remove();
            }
            debug!("Memory cache hit for {} on target {}", url, target_id);
            return None;
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let load = PendingLoad {
            url: url.to_string(),
            ticket,
        };
        let entry = self.pending.entry(target_id);
        target.set_bitmap(None);
        entry.insert(load);

        let url = url.to_string();
        let pipeline = self.pipeline.clone();
        let bitmaps = self.bitmaps.clone();
        let pending = self.pending.clone();
        let dispatcher = self.dispatcher.clone();

        Some(self.runtime.spawn(async move {
            let loaded = pipeline.fetch_image_bitmap(&url).await;

            let bitmap = match loaded {
                Some(bitmap) => bitmap,
                None => {
                    pending.remove_if(&target_id, |_, p| p.ticket == ticket);
                    return;
                }
            };
            bitmaps.insert(url.clone(), bitmap.clone());

            dispatcher.dispatch(Box::new(move || {
                match pending.entry(target_id) {
                    Entry::Occupied(current) if current.get().ticket == ticket => {
                        target.set_bitmap(Some(bitmap));
                        current.remove();
                    }
                    _ => debug!(
                        "Target {} moved on before {} finished, discarding result",
                        target_id, url
                    ),
                }
            }));
        }))
    }

    pub fn cached_bitmap(&self, url: &str) -> Option<Bitmap> {
        self.bitmaps.get(url).map(|entry| entry.value().clone())
    }

    pub fn cached_bitmap_count(&self) -> usize {
        self.bitmaps.len()
    }

    /// URL `target_id` is currently waiting on, if any.
    pub fn pending_url(&self, target_id: TargetId) -> Option<String> {
        self.pending.get(&target_id).map(|p| p.url.clone())
    }

    pub fn clear_memory_cache(&self) {
        self.bitmaps.clear();
    }
}
