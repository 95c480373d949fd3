use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::{ApiConfig, CacheConfig, DatabaseConfig, UploadConfig};
use crate::feed::{FeedSource, SwrCache};
use crate::models::airdrop::{AirdropView, ListingPage};
use crate::store::airdrops::{ListingQuery, list_airdrops};

pub const NOT_CONFIGURED_REASON: &str = "DATABASE_URL is not set";

/// The database collaborator, or the reason it is missing. Handlers answer
/// 503 instead of failing when it is unconfigured.
#[derive(Clone, Debug)]
pub enum Persistence {
    Connected(DatabaseConnection),
    Unconfigured { reason: String },
}

impl Persistence {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let Some(url) = config.url.as_deref() else {
            warn!("No database configured; data routes will answer 503");
            return Ok(Self::Unconfigured {
                reason: NOT_CONFIGURED_REASON.to_string(),
            });
        };
        let mut options = ConnectOptions::new(url.to_string());
        options
            .max_connections(config.max_connections)
            .sqlx_logging(true)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug)
            .acquire_timeout(Duration::from_secs(10));
        if let Some(min) = config.min_connections {
            options.min_connections(min);
        }
        let connection = Database::connect(options)
            .await
            .context("Failed to connect to the database")?;
        Ok(Self::Connected(connection))
    }

    pub fn connection(&self) -> Option<&DatabaseConnection> {
        match self {
            Self::Connected(connection) => Some(connection),
            Self::Unconfigured { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotConfigured;

#[derive(Clone)]
pub struct AppState {
    pub persistence: Persistence,
    pub cache: Arc<ApiCache>,
    pub rating_reads: RateLimiter,
    pub rating_writes: RateLimiter,
    pub uploads: Arc<UploadConfig>,
    pub admin_token: Option<Arc<str>>,
    pub feed_page_size: u64,
    /// Environment edits made through the admin API; applied on restart
    pub env_overrides: Arc<RwLock<BTreeMap<String, Option<String>>>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: &ApiConfig, persistence: Persistence) -> Self {
        assert!(
            (1..=100).contains(&config.feed.page_size),
            "Feed page size must be validated before building state"
        );
        let home_feed = persistence.connection().map(|connection| {
            let source = HomeFeedSource::new(connection.clone(), config.feed.page_size);
            SwrCache::new(source, config.cache.feed_options())
        });
        let minute = Duration::from_secs(60);
        Self {
            cache: Arc::new(ApiCache::new(&config.cache, home_feed)),
            persistence,
            rating_reads: RateLimiter::new(config.ratings.read_per_minute, minute),
            rating_writes: RateLimiter::new(config.ratings.write_per_minute, minute),
            uploads: Arc::new(config.uploads.clone()),
            admin_token: config.admin.token.as_deref().map(Arc::from),
            feed_page_size: config.feed.page_size,
            env_overrides: Arc::new(RwLock::new(BTreeMap::new())),
            start_time: Instant::now(),
        }
    }

    pub fn database(&self) -> Result<&DatabaseConnection, NotConfigured> {
        self.persistence.connection().ok_or(NotConfigured)
    }
}

/// Loads the default listing page straight from the database.
pub struct HomeFeedSource {
    database: DatabaseConnection,
    query: ListingQuery,
}

impl HomeFeedSource {
    pub fn new(database: DatabaseConnection, page_size: u64) -> Self {
        Self {
            database,
            query: ListingQuery::home_feed(page_size),
        }
    }

    pub fn query(&self) -> &ListingQuery {
        &self.query
    }
}

#[async_trait]
impl FeedSource for HomeFeedSource {
    type Output = ListingPage;

    async fn fetch(&self) -> Result<ListingPage> {
        let page = list_airdrops(&self.database, &self.query)
            .await
            .context("Failed to load the home feed")?;
        info!("Home feed loaded with {} airdrops", page.items.len());
        Ok(page)
    }
}

pub struct ApiCache {
    /// Keyed by the raw id-or-slug path segment
    pub details: Cache<String, Arc<AirdropView>>,
    pub listings: Cache<ListingQuery, Arc<ListingPage>>,
    pub home_feed: Option<Arc<SwrCache<HomeFeedSource>>>,
}

impl ApiCache {
    pub fn new(config: &CacheConfig, home_feed: Option<Arc<SwrCache<HomeFeedSource>>>) -> Self {
        assert!(
            config.detail_max_capacity >= 10,
            "Detail cache capacity threshold"
        );

        let details = Cache::builder()
            .max_capacity(config.detail_max_capacity)
            .time_to_live(Duration::from_secs(config.detail_ttl_seconds))
            .time_to_idle(Duration::from_secs(config.detail_ttl_seconds / 2 + 1))
            .build();

        let listings = Cache::builder()
            .max_capacity(config.listing_max_capacity)
            .time_to_live(Duration::from_secs(config.listing_ttl_seconds))
            .build();

        Self {
            details,
            listings,
            home_feed,
        }
    }

    /// Drops detail and filtered-listing entries. The home feed keeps serving
    /// until its own stale time passes.
    pub fn invalidate_lookups(&self) {
        self.details.invalidate_all();
        self.listings.invalidate_all();
    }

    /// Everything derived from the airdrops table, including the home feed.
    pub async fn invalidate_airdrops(&self) {
        self.invalidate_lookups();
        if let Some(feed) = &self.home_feed {
            feed.clear_cache().await;
        }
    }
}

/// Fixed-window request counter per key. A window opens on the first hit and
/// closes `window` later, when moka expires the entry.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Cache<String, Arc<AtomicU32>>,
    limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        assert!(limit > 0, "Rate limit must be positive");
        let windows = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(window)
            .build();
        Self { windows, limit }
    }

    pub async fn check(&self, key: &str) -> RateDecision {
        let counter = self
            .windows
            .get_with(key.to_string(), async { Arc::new(AtomicU32::new(0)) })
            .await;
        let used = counter.fetch_add(1, AtomicOrdering::SeqCst).saturating_add(1);
        RateDecision {
            allowed: used <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(used),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limiter_counts_per_key() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("1.1.1.1").await.allowed);
        let second = limiter.check("1.1.1.1").await;
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        assert!(!limiter.check("1.1.1.1").await.allowed);
        assert!(limiter.check("2.2.2.2").await.allowed);
    }

    #[tokio::test]
    async fn unconfigured_database_has_no_home_feed() {
        let mut config = ApiConfig::default();
        config.validate().unwrap();
        let persistence = Persistence::connect(&config.database).await.unwrap();
        assert!(matches!(persistence, Persistence::Unconfigured { .. }));

        let state = AppState::new(&config, persistence);
        assert_eq!(state.database().unwrap_err(), NotConfigured);
        assert!(state.cache.home_feed.is_none());
        assert_eq!(state.rating_writes.limit(), 5);
    }
}
