pub mod settings;

pub use settings::Settings;

use crate::error::FetchError;
use std::sync::Arc;

/// Loads `.env` (if present), reads the environment and validates the result.
/// Logging is usually not installed yet; call [`Settings::validate_and_log`]
/// once it is.
pub fn load_config() -> Result<Arc<Settings>, FetchError> {
    dotenv::dotenv().ok();

    let settings = Settings::from_env();

    if settings.http_timeout_secs == 0 {
        return Err(FetchError::Config(
            "NETCACHE_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
        ));
    }
    if settings.cache_dir.as_os_str().is_empty() {
        return Err(FetchError::Config("NETCACHE_CACHE_DIR cannot be empty".to_string()));
    }
    if let Some(url) = &settings.redis_url {
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(FetchError::Config(format!(
                "NETCACHE_REDIS_URL must be a redis:// or rediss:// URL, got '{}'",
                url
            )));
        }
    }

    Ok(Arc::new(settings))
}
