// src/main.rs
use clap::{Parser, Subcommand};
use log::{error, info};
use netcache::{
    cache::{CacheStore, MemoryCacheStore, RedisCacheStore},
    config::{load_config, Settings},
    fetch::Fetcher,
    images::{ImagePipeline, RasterDecoder},
    net::{AlwaysConnected, Connectivity, HttpTransport},
    utils::setup_logging,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "netcache", about = "Fetch remote resources through the persistent cache")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a resource as text
    #[command(name = "string")]
    Text {
        url: String,
        /// Cache validity in seconds (defaults to NETCACHE_DEFAULT_TTL_SECS)
        #[arg(long)]
        ttl: Option<u64>,
        /// Skip the cache lookup and refresh the entry
        #[arg(long)]
        force: bool,
    },
    /// Print a resource as pretty JSON
    Json {
        url: String,
        #[arg(long)]
        ttl: Option<u64>,
        #[arg(long)]
        force: bool,
    },
    /// Download an image into the cache directory and print its path and size
    Image { url: String },
}

async fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn CacheStore>> {
    match &settings.redis_url {
        Some(url) => Ok(Arc::new(RedisCacheStore::new(url).await?)),
        None => {
            info!("No NETCACHE_REDIS_URL configured, using in-process cache store");
            Ok(Arc::new(MemoryCacheStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_config()?;
    setup_logging(settings.log_level)?;
    settings.validate_and_log();

    let transport = Arc::new(HttpTransport::new(&settings.user_agent, settings.http_timeout())?);
    let store = build_store(&settings).await?;
    let fetcher = Fetcher::new(
        transport,
        store,
        Connectivity::new(Arc::new(AlwaysConnected)),
        settings.http_timeout(),
    );
    let ttl_or_default = |ttl: Option<u64>| ttl.map(Duration::from_secs).unwrap_or(settings.default_ttl());

    match cli.command {
        Command::Text { url, ttl, force } => {
            match fetcher.try_fetch_string_cached(&url, ttl_or_default(ttl), force).await {
                Ok(body) => println!("{}", body),
                Err(e) => {
                    error!("Could not fetch {}: {}", url, e);
                    std::process::exit(1);
                }
            }
        }
        Command::Json { url, ttl, force } => {
            match fetcher
                .try_fetch_json_cached::<serde_json::Value>(&url, ttl_or_default(ttl), force)
                .await
            {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(e) => {
                    error!("Could not fetch JSON from {}: {}", url, e);
                    std::process::exit(1);
                }
            }
        }
        Command::Image { url } => {
            let pipeline = ImagePipeline::new(fetcher, settings.cache_dir.clone(), Arc::new(RasterDecoder))
                .with_image_ttl(settings.image_ttl());
            let path = match pipeline.try_fetch_image_file(&url).await {
                Ok(path) => path,
                Err(e) => {
                    error!("Could not fetch image {}: {}", url, e);
                    std::process::exit(1);
                }
            };
            match pipeline.try_fetch_image_bitmap(&url).await {
                Ok(bitmap) => println!("{} {}x{}", path.display(), bitmap.width(), bitmap.height()),
                Err(e) => {
                    error!("Downloaded {} but could not decode it: {}", path.display(), e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
