//! Image download, decode and display binding.

pub mod binder;
pub mod decoder;
pub mod pipeline;

pub use binder::{
    ChannelDispatcher, DisplayTarget, ImageBinder, InlineDispatcher, TargetId, UiDispatcher,
    UiQueue,
};
pub use decoder::{Bitmap, ImageDecoder, RasterDecoder};
pub use pipeline::{ImagePipeline, MapPayloadBuilder, CURRENT_LOCATION_MAP};
