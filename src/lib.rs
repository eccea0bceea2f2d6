pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod images;
pub mod net;
pub mod testing; // Fakes for every collaborator seam
pub mod utils;

pub use cache::{CacheKind, CacheStore, MemoryCacheStore, RedisCacheStore};
pub use config::Settings;
pub use error::{FetchError, Result};
pub use fetch::{Fetcher, JsonArray, JsonObject};
pub use images::{
    Bitmap, DisplayTarget, ImageBinder, ImageDecoder, ImagePipeline, MapPayloadBuilder,
    RasterDecoder, UiDispatcher,
};
pub use net::{AlwaysConnected, Connectivity, ConnectivityProbe, HttpTransport, Transport};
