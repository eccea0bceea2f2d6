use crate::error::FetchError;
use image::DynamicImage;
use std::fmt;
use std::sync::Arc;

/// Decoded, renderable image. Cheap to clone.
#[derive(Clone)]
pub struct Bitmap(Arc<DynamicImage>);

impl Bitmap {
    pub fn new(image: DynamicImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.0
    }

    /// True when both handles point at the same decoded image.
    pub fn same_as(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Bytes → bitmap. CPU-bound; callers run it off the async executor.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Bitmap, FetchError>;
}

/// Decodes any format the `image` crate was built with.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Bitmap, FetchError> {
        image::load_from_memory(bytes)
            .map(Bitmap::new)
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}
