//! Testing infrastructure: in-process fakes for every collaborator seam, plus
//! a helper wiring them into a ready-to-use pipeline.

pub mod mocks;

pub use mocks::{DimensionDecoder, FixedMapBuilder, MockTransport, RecordingTarget};

use crate::cache::MemoryCacheStore;
use crate::fetch::Fetcher;
use crate::images::ImagePipeline;
use crate::net::{Connectivity, StaticConnectivity, TransportKind};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Everything a test needs to drive and inspect the fetch stack.
pub struct TestHarness {
    pub transport: Arc<MockTransport>,
    pub store: Arc<MemoryCacheStore>,
    pub connectivity: Arc<StaticConnectivity>,
    pub fetcher: Fetcher,
}

impl TestHarness {
    /// Online over wireless, empty store, nothing scripted.
    pub fn new() -> Self {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(MemoryCacheStore::new());
        let connectivity = Arc::new(StaticConnectivity::online(TransportKind::Wireless));
        let fetcher = Fetcher::new(
            transport.clone(),
            store.clone(),
            Connectivity::new(connectivity.clone()),
            Duration::from_secs(5),
        );
        Self {
            transport,
            store,
            connectivity,
            fetcher,
        }
    }

    pub fn go_offline(&self) {
        self.connectivity.set(None);
    }

    /// Pipeline over this harness, decoding with [`DimensionDecoder`].
    pub fn pipeline(&self, cache_dir: &Path) -> ImagePipeline {
        ImagePipeline::new(self.fetcher.clone(), cache_dir, Arc::new(DimensionDecoder))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
