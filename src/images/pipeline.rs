//! Image pipeline: downloads image bytes into content-addressed files under the
//! cache directory, registers them in the persistent store and decodes them.
//!
//! A file is registered only after it has been completely written. Bytes land
//! in a uniquely named `*.part` sibling first and are renamed into place, so a
//! half-written file never sits at a registered path. Cached paths are always
//! re-checked for existence because the cache directory can be cleaned behind
//! the store's back.

use super::decoder::{Bitmap, ImageDecoder};
use crate::cache::CacheKind;
use crate::config::settings::VALIDITY_TEN_DAYS_SECS;
use crate::error::{FetchError, Result};
use crate::fetch::{absent_on_error, Fetcher};
use crate::utils::{escape_spaces, md5_hex, sanitize_file_stem};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use log::{debug, info, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// File name used by [`ImagePipeline::save_encoded_image`] callers for the
/// current-location snapshot.
pub const CURRENT_LOCATION_MAP: &str = "current_location_map";

static PART_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Specialized request that returns a map image as a base64 blob instead of a
/// plain URL (facility / room locator).
#[async_trait]
pub trait MapPayloadBuilder: Send + Sync {
    async fn map_with_location(&self, longitude: f64, latitude: f64) -> Option<String>;
}

pub struct ImagePipeline {
    fetcher: Fetcher,
    cache_dir: PathBuf,
    image_ttl: Duration,
    decoder: Arc<dyn ImageDecoder>,
    map_builder: Option<Arc<dyn MapPayloadBuilder>>,
}

impl std::fmt::Debug for ImagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePipeline")
            .field("cache_dir", &self.cache_dir)
            .field("image_ttl", &self.image_ttl)
            .field("map_builder", &self.map_builder.is_some())
            .finish()
    }
}

impl ImagePipeline {
    pub fn new(fetcher: Fetcher, cache_dir: impl Into<PathBuf>, decoder: Arc<dyn ImageDecoder>) -> Self {
        Self {
            fetcher,
            cache_dir: cache_dir.into(),
            image_ttl: Duration::from_secs(VALIDITY_TEN_DAYS_SECS),
            decoder,
            map_builder: None,
        }
    }

    pub fn with_image_ttl(mut self, ttl: Duration) -> Self {
        self.image_ttl = ttl;
        self
    }

    pub fn with_map_builder(mut self, builder: Arc<dyn MapPayloadBuilder>) -> Self {
        self.map_builder = Some(builder);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Deterministic location of the downloaded file for `url` (already escaped).
    pub fn file_for_url(&self, url: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.jpg", md5_hex(url)))
    }

    /// Readable stem plus a short digest of the raw name, so names that
    /// sanitise to the same stem still get distinct files.
    pub fn file_for_name(&self, name: &str) -> PathBuf {
        let digest = md5_hex(name);
        self.cache_dir
            .join(format!("{}-{}.jpg", sanitize_file_stem(name), &digest[..8]))
    }

    /// Downloads `url` into `target`. Returns immediately, without any network
    /// access, if `target` already exists; its content is not verified.
    pub async fn download_to_file(&self, url: &str, target: &Path) -> Result<()> {
        if file_exists(target).await {
            debug!("{} already present, skipping download of {}", target.display(), url);
            return Ok(());
        }

        let bytes = self.fetcher.try_fetch_bytes(url).await?;
        write_atomically(target, &bytes).await?;
        debug!("Downloaded {} ({} bytes) to {}", url, bytes.len(), target.display());
        Ok(())
    }

    pub async fn try_fetch_image_file(&self, url: &str) -> Result<PathBuf> {
        if url.trim().is_empty() {
            return Err(FetchError::EmptyUrl);
        }
        let url = escape_spaces(url);

        if let Some(path) = self.cached_file(&url).await {
            return Ok(path);
        }

        let path = self.file_for_url(&url);
        self.download_to_file(&url, &path).await?;

        // The file is complete on disk; only now may it be registered.
        self.fetcher
            .cache_register(&url, &path.to_string_lossy(), self.image_ttl, CacheKind::Image)
            .await;
        Ok(path)
    }

    pub async fn fetch_image_file(&self, url: &str) -> Option<PathBuf> {
        absent_on_error("fetch_image_file", url, self.try_fetch_image_file(url).await)
    }

    /// Image delivered as an inline base64 blob by the map builder, stored
    /// under a name-derived path and registered under `name`. A registered
    /// file that still exists is returned without consulting the builder.
    pub async fn try_fetch_named_image(
        &self,
        name: &str,
        longitude: f64,
        latitude: f64,
    ) -> Result<PathBuf> {
        if name.trim().is_empty() {
            return Err(FetchError::EmptyUrl);
        }

        if let Some(path) = self.cached_file(name).await {
            return Ok(path);
        }

        let builder = self
            .map_builder
            .as_ref()
            .ok_or_else(|| FetchError::Config("no map payload builder configured".to_string()))?;
        let payload = builder
            .map_with_location(longitude, latitude)
            .await
            .ok_or_else(|| FetchError::NotFound(format!("map payload for '{}'", name)))?;

        let path = self.file_for_name(name);
        let bytes = decode_base64(&payload)?;
        write_atomically(&path, &bytes).await?;

        self.fetcher
            .cache_register(name, &path.to_string_lossy(), self.image_ttl, CacheKind::Image)
            .await;
        info!("Stored map image for '{}' at {}", name, path.display());
        Ok(path)
    }

    pub async fn fetch_named_image(&self, name: &str, longitude: f64, latitude: f64) -> Option<PathBuf> {
        absent_on_error(
            "fetch_named_image",
            name,
            self.try_fetch_named_image(name, longitude, latitude).await,
        )
    }

    /// Writes a base64 image blob to [`Self::file_for_name`], replacing any
    /// previous file. Not registered in the store.
    pub async fn try_save_encoded_image(&self, name: &str, encoded: &str) -> Result<PathBuf> {
        let path = self.file_for_name(name);
        let bytes = decode_base64(encoded)?;
        write_atomically(&path, &bytes).await?;
        Ok(path)
    }

    pub async fn save_encoded_image(&self, name: &str, encoded: &str) -> Option<PathBuf> {
        absent_on_error(
            "save_encoded_image",
            name,
            self.try_save_encoded_image(name, encoded).await,
        )
    }

    /// File fetch followed by a decode on the blocking pool. A corrupt file
    /// fails here even though the download itself succeeded.
    pub async fn try_fetch_image_bitmap(&self, url: &str) -> Result<Bitmap> {
        let path = self.try_fetch_image_file(url).await?;
        let bytes = tokio::fs::read(&path).await?;
        let decoder = self.decoder.clone();
        tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| FetchError::Decode(format!("decode task failed: {}", e)))?
    }

    pub async fn fetch_image_bitmap(&self, url: &str) -> Option<Bitmap> {
        absent_on_error("fetch_image_bitmap", url, self.try_fetch_image_bitmap(url).await)
    }

    /// Store lookup that only trusts paths still present on disk.
    async fn cached_file(&self, key: &str) -> Option<PathBuf> {
        let path = PathBuf::from(self.fetcher.cache_lookup(key).await?);
        if file_exists(&path).await {
            Some(path)
        } else {
            debug!(
                "Cache entry for '{}' points at missing file {}",
                key,
                path.display()
            );
            None
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    // Platform encoders wrap lines.
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(general_purpose::STANDARD.decode(compact)?)
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("download"));
    name.push(format!(
        ".{}.{}.part",
        std::process::id(),
        PART_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    target.with_file_name(name)
}

/// Writes `bytes` to a private sibling and renames it onto `target`. The
/// sibling is removed on every failure path.
async fn write_atomically(target: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let part = part_path(target);

    let written = write_part(&part, bytes).await;
    let result = match written {
        Ok(()) => tokio::fs::rename(&part, target).await.map_err(FetchError::from),
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        warn!("Failed to write {}: {}", target.display(), e);
        if let Err(cleanup) = tokio::fs::remove_file(&part).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove partial file {}: {}", part.display(), cleanup);
            }
        }
    }
    result
}

async fn write_part(part: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(part).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_paths_are_unique_siblings() {
        let target = Path::new("/cache/abc.jpg");
        let a = part_path(target);
        let b = part_path(target);
        assert_ne!(a, b);
        assert_eq!(a.parent(), target.parent());
        assert!(a.to_string_lossy().ends_with(".part"));
    }

    #[test]
    fn test_base64_tolerates_line_wrapping() {
        assert_eq!(decode_base64("aGVs\nbG8=\n").unwrap(), b"hello".to_vec());
        assert!(matches!(decode_base64("***"), Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_write_atomically_creates_parent_and_leaves_no_part() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("img.jpg");

        write_atomically(&target, b"bytes").await.unwrap();

        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"bytes".to_vec());
        let mut entries = tokio::fs::read_dir(target.parent().unwrap()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(names, vec![OsString::from("img.jpg")]);
    }
}
