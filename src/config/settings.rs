use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Ten days, the validity used for cached image files.
pub const VALIDITY_TEN_DAYS_SECS: u64 = 10 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub default_ttl_secs: u64,
    pub image_ttl_secs: u64,
    pub redis_url: Option<String>,
    pub log_level: log::LevelFilter,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: env::temp_dir().join("netcache"),
            http_timeout_secs: 10,
            user_agent: format!("netcache/{}", env!("CARGO_PKG_VERSION")),
            default_ttl_secs: 600,
            image_ttl_secs: VALIDITY_TEN_DAYS_SECS,
            redis_url: None,
            log_level: log::LevelFilter::Info,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Settings::default();
        Settings {
            cache_dir: env::var("NETCACHE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            http_timeout_secs: env::var("NETCACHE_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
            user_agent: env::var("NETCACHE_USER_AGENT").unwrap_or(defaults.user_agent),
            default_ttl_secs: env::var("NETCACHE_DEFAULT_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl_secs),
            image_ttl_secs: env::var("NETCACHE_IMAGE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.image_ttl_secs),
            redis_url: env::var("NETCACHE_REDIS_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            log_level: env::var("NETCACHE_LOG_LEVEL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_level),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn image_ttl(&self) -> Duration {
        Duration::from_secs(self.image_ttl_secs)
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn validate_and_log(&self) {
        log::info!("netcache configuration loaded: {:?}", self);
        if self.http_timeout_secs > 120 {
            log::warn!(
                "HTTP timeout of {}s is unusually long for a mobile connection",
                self.http_timeout_secs
            );
        }
    }
}
