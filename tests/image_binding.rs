//! Integration tests for asynchronous image binding
//!
//! These tests verify latest-request-wins reconciliation when display
//! targets are rebound while earlier loads are still in flight.

use netcache::{
    images::{ChannelDispatcher, DisplayTarget, ImageBinder, InlineDispatcher},
    testing::{RecordingTarget, TestHarness},
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::runtime::Handle;

const URL_A: &str = "https://example/a.jpg";
const URL_B: &str = "https://example/b.jpg";
const URL_C: &str = "https://example/c.jpg";

fn inline_binder(harness: &TestHarness, dir: &TempDir) -> ImageBinder {
    ImageBinder::new(
        Arc::new(harness.pipeline(dir.path())),
        Arc::new(InlineDispatcher),
        Handle::current(),
    )
}

fn dims(target: &RecordingTarget) -> Option<(u32, u32)> {
    target.current().map(|b| (b.width(), b.height()))
}

#[tokio::test]
async fn test_memory_cache_hit_is_applied_synchronously() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new();
    harness.transport.respond_ok(URL_A, "1x1");
    let binder = inline_binder(&harness, &dir);

    let first = Arc::new(RecordingTarget::new(1));
    binder.bind_image_async(URL_A, first.clone()).unwrap().await.unwrap();
    assert_eq!(dims(&first), Some((1, 1)));

    let second = Arc::new(RecordingTarget::new(2));
    assert!(binder.bind_image_async(URL_A, second.clone()).is_none());
    assert_eq!(dims(&second), Some((1, 1)));
    assert_eq!(second.updates(), 1, "no placeholder on a hit");
    assert_eq!(harness.transport.calls(URL_A), 1);
}

#[tokio::test]
async fn test_miss_clears_target_and_records_pending_url() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new();
    harness
        .transport
        .respond_delayed(URL_A, "1x1", Duration::from_millis(50));
    let binder = inline_binder(&harness, &dir);
    let target = Arc::new(RecordingTarget::new(7));

    let handle = binder.bind_image_async(URL_A, target.clone()).unwrap();
    assert_eq!(target.updates(), 1);
    assert!(target.current().is_none());
    assert_eq!(binder.pending_url(7).as_deref(), Some(URL_A));

    handle.await.unwrap();
    assert_eq!(dims(&target), Some((1, 1)));
    assert_eq!(binder.pending_url(7), None);
}

#[tokio::test]
async fn test_slow_stale_load_does_not_overwrite_newer_result() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new();
    harness
        .transport
        .respond_delayed(URL_A, "1x1", Duration::from_millis(300));
    harness.transport.respond_ok(URL_B, "2x2");
    let binder = inline_binder(&harness, &dir);
    let target = Arc::new(RecordingTarget::new(1));

    let slow = binder.bind_image_async(URL_A, target.clone()).unwrap();
    let fast = binder.bind_image_async(URL_B, target.clone()).unwrap();

    fast.await.unwrap();
    assert_eq!(dims(&target), Some((2, 2)));
    let shown = target.current().unwrap();

    slow.await.unwrap();
    assert!(target.current().unwrap().same_as(&shown), "B must still be displayed");

    let cached_a = binder.cached_bitmap(URL_A).expect("A is still cached for later use");
    assert_eq!((cached_a.width(), cached_a.height()), (1, 1));
    assert_eq!(binder.cached_bitmap_count(), 2);
}

#[tokio::test]
async fn test_older_load_finishing_first_is_suppressed_while_newer_is_pending() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new();
    harness.transport.respond_ok(URL_A, "1x1");
    harness
        .transport
        .respond_delayed(URL_B, "2x2", Duration::from_millis(200));
    let binder = inline_binder(&harness, &dir);
    let target = Arc::new(RecordingTarget::new(1));

    let older = binder.bind_image_async(URL_A, target.clone()).unwrap();
    let newer = binder.bind_image_async(URL_B, target.clone()).unwrap();

    older.await.unwrap();
    assert!(target.current().is_none(), "A must not show while B is pending");
    assert_eq!(binder.pending_url(1).as_deref(), Some(URL_B));

    newer.await.unwrap();
    assert_eq!(dims(&target), Some((2, 2)));
}

#[tokio::test]
async fn test_cache_hit_rebind_supersedes_pending_load() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new();
    harness
        .transport
        .respond_delayed(URL_A, "1x1", Duration::from_millis(200));
    harness.transport.respond_ok(URL_C, "3x3");
    let binder = inline_binder(&harness, &dir);

    // Warm the memory cache for C through another target.
    let other = Arc::new(RecordingTarget::new(99));
    binder.bind_image_async(URL_C, other).unwrap().await.unwrap();

    let target = Arc::new(RecordingTarget::new(1));
    let slow = binder.bind_image_async(URL_A, target.clone()).unwrap();
    assert!(binder.bind_image_async(URL_C, target.clone()).is_none());
    assert_eq!(dims(&target), Some((3, 3)));

    slow.await.unwrap();
    assert_eq!(dims(&target), Some((3, 3)));
}

#[tokio::test]
async fn test_failed_load_leaves_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new();
    let binder = inline_binder(&harness, &dir);
    let target = Arc::new(RecordingTarget::new(3));

    // Unscripted URL answers 404.
    binder.bind_image_async(URL_A, target.clone()).unwrap().await.unwrap();

    assert_eq!(target.updates(), 1);
    assert!(target.current().is_none());
    assert_eq!(binder.pending_url(3), None);
    assert_eq!(binder.cached_bitmap_count(), 0);
}

#[tokio::test]
async fn test_channel_dispatcher_defers_mutation_to_ui_queue() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new();
    harness.transport.respond_ok(URL_A, "1x1");
    let (dispatcher, mut ui_queue) = ChannelDispatcher::new();
    let binder = ImageBinder::new(
        Arc::new(harness.pipeline(dir.path())),
        Arc::new(dispatcher),
        Handle::current(),
    );
    let target = Arc::new(RecordingTarget::new(5));

    binder.bind_image_async(URL_A, target.clone()).unwrap().await.unwrap();
    // Loaded and cached, but the UI thread has not run yet.
    assert!(target.current().is_none());
    assert!(binder.cached_bitmap(URL_A).is_some());

    assert_eq!(ui_queue.drain(), 1);
    assert_eq!(dims(&target), Some((1, 1)));
    assert_eq!(target.id(), 5);
}

#[tokio::test]
async fn test_many_targets_load_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let harness = TestHarness::new();
    for i in 0..8u32 {
        harness.transport.respond_delayed(
            &format!("https://example/{}.jpg", i),
            format!("{}x1", i + 1),
            Duration::from_millis(20),
        );
    }
    let binder = inline_binder(&harness, &dir);

    let targets: Vec<Arc<RecordingTarget>> =
        (0..8u64).map(|i| Arc::new(RecordingTarget::new(i))).collect();
    let handles: Vec<_> = targets
        .iter()
        .enumerate()
        .filter_map(|(i, t)| binder.bind_image_async(&format!("https://example/{}.jpg", i), t.clone()))
        .collect();
    assert_eq!(handles.len(), 8);
    futures::future::join_all(handles).await;

    for (i, target) in targets.iter().enumerate() {
        assert_eq!(dims(target), Some((i as u32 + 1, 1)));
    }
    assert_eq!(binder.cached_bitmap_count(), 8);
}
