use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::info;

use crate::feed::FeedOptions;

const DEFAULT_CONFIG_PATH: &str = "config/api.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub ratings: RatingsConfig,
    pub uploads: UploadConfig,
    pub admin: AdminConfig,
    pub feed: FeedConfig,
}

impl ApiConfig {
    /// Loads `config/api.toml` (or `AIRDROP_API_CONFIG`), an optional
    /// `config/api.<AIRDROP_API_ENV>.toml` overlay, then `AIRDROP_API__*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let configured_path = std::env::var("AIRDROP_API_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        assert!(
            !configured_path.is_empty(),
            "Configuration path must be non-empty"
        );
        assert!(
            configured_path.len() < 4096,
            "Configuration path length exceeds hard limit"
        );

        let mut builder = Config::builder()
            .add_source(File::new(&configured_path, FileFormat::Toml).required(false));

        if let Ok(env_override) = std::env::var("AIRDROP_API_ENV") {
            if !env_override.is_empty() {
                let env_file = format!("config/api.{}.toml", env_override);
                if Path::new(&env_file).exists() {
                    builder = builder.add_source(File::new(&env_file, FileFormat::Toml));
                }
            }
        }

        builder = builder.add_source(Environment::with_prefix("AIRDROP_API").separator("__"));

        let settings = builder
            .build()
            .map_err(|err| map_config_error(err, &configured_path))?;
        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize API configuration")?;

        if config.database.url.is_none() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                info!("Using DATABASE_URL for the database connection");
                config.database.url = Some(url);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&mut self) -> Result<()> {
        ensure!(self.server.port > 0, "Server port must be greater than zero");
        if let Some(url) = self.database.url.as_deref() {
            if url.trim().is_empty() {
                self.database.url = None;
            }
        }
        self.database.ensure_bounds()?;
        self.cache.ensure_bounds()?;
        self.ratings.ensure_bounds()?;
        self.uploads.ensure_bounds()?;
        self.feed.ensure_bounds()?;
        if let Some(token) = self.admin.token.as_deref() {
            ensure!(
                token.len() >= 16,
                "Admin token must be at least 16 characters"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: Option<IpAddr>,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        let host = self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(self.port != 0, "HTTP port cannot be zero");
        SocketAddr::new(host, self.port)
    }
}

/// An absent `url` leaves the API running in the "not configured" state:
/// every data-bearing route answers 503 instead of failing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: Option<u32>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            min_connections: None,
        }
    }
}

impl DatabaseConfig {
    fn ensure_bounds(&self) -> Result<()> {
        ensure!(
            self.max_connections >= self.min_connections.unwrap_or(1),
            "Max connections must be >= min connections"
        );
        ensure!(self.max_connections <= 128, "Connection pool oversized");
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub listing_stale_ms: u64,
    pub listing_cache_ms: u64,
    pub background_refresh: bool,
    pub auto_refresh_ms: Option<u64>,
    pub listing_max_capacity: u64,
    pub listing_ttl_seconds: u64,
    pub detail_max_capacity: u64,
    pub detail_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            listing_stale_ms: 150_000,
            listing_cache_ms: 600_000,
            background_refresh: true,
            auto_refresh_ms: None,
            listing_max_capacity: 256,
            listing_ttl_seconds: 60,
            detail_max_capacity: 1_000,
            detail_ttl_seconds: 300,
        }
    }
}

impl CacheConfig {
    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions::new(
            self.background_refresh,
            Duration::from_millis(self.listing_stale_ms),
            Duration::from_millis(self.listing_cache_ms),
        )
    }

    pub fn auto_refresh_interval(&self) -> Option<Duration> {
        self.auto_refresh_ms.map(Duration::from_millis)
    }

    fn ensure_bounds(&self) -> Result<()> {
        ensure!(
            self.listing_cache_ms >= self.listing_stale_ms,
            "listing_cache_ms must be >= listing_stale_ms"
        );
        ensure!(
            self.listing_cache_ms <= 86_400_000,
            "Listing cache time cannot exceed one day"
        );
        if let Some(interval) = self.auto_refresh_ms {
            ensure!(interval >= 1_000, "Auto refresh interval must be >= 1s");
        }
        ensure!(
            self.detail_max_capacity >= 10,
            "Detail cache capacity must be at least 10"
        );
        ensure!(
            self.detail_ttl_seconds <= 86_400,
            "Detail cache TTL cannot exceed one day"
        );
        ensure!(
            self.listing_ttl_seconds <= 3_600,
            "Listing cache TTL cannot exceed one hour"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatingsConfig {
    pub read_per_minute: u32,
    pub write_per_minute: u32,
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            read_per_minute: 30,
            write_per_minute: 5,
        }
    }
}

impl RatingsConfig {
    fn ensure_bounds(&self) -> Result<()> {
        ensure!(self.read_per_minute > 0, "Rating read limit must be positive");
        ensure!(
            self.write_per_minute > 0,
            "Rating write limit must be positive"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub directory: PathBuf,
    pub public_path: String,
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("uploads"),
            public_path: "/uploads".to_string(),
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

impl UploadConfig {
    fn ensure_bounds(&self) -> Result<()> {
        ensure!(
            self.public_path.starts_with('/') && self.public_path.len() > 1,
            "uploads.public_path must be an absolute, non-root path"
        );
        ensure!(self.max_bytes > 0, "uploads.max_bytes must be positive");
        ensure!(
            self.max_bytes <= 64 * 1024 * 1024,
            "uploads.max_bytes exceeds 64 MiB"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub page_size: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_ms: 10_000,
            page_size: 12,
        }
    }
}

impl FeedConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn ensure_bounds(&self) -> Result<()> {
        ensure!(
            self.request_timeout_ms >= 100,
            "Feed timeout must be at least 100ms"
        );
        ensure!(
            self.request_timeout_ms <= 60_000,
            "Feed timeout cannot exceed 60 seconds"
        );
        ensure!(
            (1..=100).contains(&self.page_size),
            "Feed page size must be between 1 and 100"
        );
        Ok(())
    }
}

fn map_config_error(err: ConfigError, path: &str) -> ConfigError {
    match err {
        ConfigError::NotFound(_) => ConfigError::NotFound(path.to_string()),
        other => other,
    }
}
