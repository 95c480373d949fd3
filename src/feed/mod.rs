//! Stale-while-revalidate cache for listing data.
//!
//! A read serves cached data immediately while it is younger than
//! `cache_time`; once it is older than `stale_time` a single background
//! refresh is started. Every fetch carries a request token and only responses
//! newer than the last applied one may replace the data, so a slow fetch can
//! never overwrite a fresher result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    async fn fetch(&self) -> Result<Self::Output>;
}

#[async_trait]
impl<S: FeedSource> FeedSource for Arc<S> {
    type Output = S::Output;

    async fn fetch(&self) -> Result<Self::Output> {
        (**self).fetch().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedOptions {
    pub background_refresh: bool,
    pub stale_time: Duration,
    pub cache_time: Duration,
}

impl FeedOptions {
    pub fn new(background_refresh: bool, stale_time: Duration, cache_time: Duration) -> Self {
        assert!(
            cache_time >= stale_time,
            "Cache time must be at least the stale time"
        );
        Self {
            background_refresh,
            stale_time,
            cache_time,
        }
    }
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self::new(true, Duration::from_secs(150), Duration::from_secs(600))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct FeedSnapshot<T> {
    pub data: Option<Arc<T>>,
    /// A blocking fetch is in flight and there is nothing usable to show
    pub loading: bool,
    pub refreshing: bool,
    pub is_stale: bool,
    pub error: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Served without fetching
    pub from_cache: bool,
}

struct Slot<T> {
    data: Option<Arc<T>>,
    fetched: Option<Instant>,
    fetched_at: Option<DateTime<Utc>>,
    error: Option<String>,
    blocking_fetches: usize,
    refreshing: bool,
    applied_token: u64,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self {
            data: None,
            fetched: None,
            fetched_at: None,
            error: None,
            blocking_fetches: 0,
            refreshing: false,
            applied_token: 0,
        }
    }

    fn age(&self) -> Option<Duration> {
        self.fetched.map(|fetched| fetched.elapsed())
    }

    fn apply(&mut self, token: u64, data: T) -> bool {
        if token <= self.applied_token {
            return false;
        }
        self.applied_token = token;
        self.data = Some(Arc::new(data));
        self.fetched = Some(Instant::now());
        self.fetched_at = Some(Utc::now());
        self.error = None;
        true
    }
}

pub struct SwrCache<S: FeedSource> {
    source: S,
    options: FeedOptions,
    slot: Mutex<Slot<S::Output>>,
    next_token: AtomicU64,
}

impl<S: FeedSource> SwrCache<S> {
    pub fn new(source: S, options: FeedOptions) -> Arc<Self> {
        Arc::new(Self {
            source,
            options,
            slot: Mutex::new(Slot::empty()),
            next_token: AtomicU64::new(0),
        })
    }

    pub fn options(&self) -> FeedOptions {
        self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Cached data when it is younger than `cache_time`, otherwise a blocking
    /// fetch. Stale-but-valid data also schedules one background refresh.
    /// An `Ok` snapshot always carries data.
    pub async fn read(self: &Arc<Self>) -> Result<FeedSnapshot<S::Output>, FeedError> {
        {
            let mut slot = self.slot.lock().await;
            let within_cache_time = slot
                .age()
                .is_some_and(|age| age <= self.options.cache_time);
            if slot.data.is_some() && within_cache_time {
                let stale = slot.age().is_some_and(|age| age > self.options.stale_time);
                if stale && self.options.background_refresh && !slot.refreshing {
                    slot.refreshing = true;
                    let token = self.issue_token();
                    let cache = Arc::clone(self);
                    tokio::spawn(async move { cache.run_background(token).await });
                }
                return Ok(self.snapshot_of(&slot, true));
            }
        }
        self.fetch_blocking().await
    }

    /// Fetches regardless of staleness. On failure the last good data is kept
    /// and the error recorded.
    pub async fn refresh(&self) -> Result<FeedSnapshot<S::Output>, FeedError> {
        self.fetch_blocking().await
    }

    /// Drops the cached data and retires every token issued so far, so that
    /// in-flight responses are discarded and the next read fetches.
    pub async fn clear_cache(&self) {
        let mut slot = self.slot.lock().await;
        slot.data = None;
        slot.fetched = None;
        slot.fetched_at = None;
        slot.error = None;
        slot.applied_token = self.next_token.load(AtomicOrdering::SeqCst);
        debug!("Feed cache cleared at token {}", slot.applied_token);
    }

    pub async fn snapshot(&self) -> FeedSnapshot<S::Output> {
        let slot = self.slot.lock().await;
        self.snapshot_of(&slot, true)
    }

    fn issue_token(&self) -> u64 {
        self.next_token.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    async fn fetch_blocking(&self) -> Result<FeedSnapshot<S::Output>, FeedError> {
        let token = {
            let mut slot = self.slot.lock().await;
            slot.blocking_fetches += 1;
            self.issue_token()
        };
        let outcome = self.source.fetch().await;

        let mut slot = self.slot.lock().await;
        assert!(slot.blocking_fetches > 0, "Blocking fetch counter underflow");
        slot.blocking_fetches -= 1;
        match outcome {
            Ok(data) => {
                if !slot.apply(token, data) {
                    debug!("Discarding superseded feed response (token {token})");
                }
                if slot.data.is_none() {
                    return Err(FeedError::Unavailable(
                        "response discarded after the cache was cleared".to_string(),
                    ));
                }
                Ok(self.snapshot_of(&slot, false))
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!("Feed fetch failed: {message}");
                if token > slot.applied_token {
                    slot.error = Some(message.clone());
                }
                if slot.data.is_some() {
                    Ok(self.snapshot_of(&slot, false))
                } else {
                    Err(FeedError::Unavailable(message))
                }
            }
        }
    }

    async fn run_background(self: Arc<Self>, token: u64) {
        let outcome = self.source.fetch().await;
        let mut slot = self.slot.lock().await;
        slot.refreshing = false;
        match outcome {
            Ok(data) => {
                if slot.apply(token, data) {
                    debug!("Background feed refresh applied (token {token})");
                } else {
                    debug!("Background feed refresh superseded (token {token})");
                }
            }
            Err(err) => warn!("Background feed refresh failed: {err:#}"),
        }
    }

    fn snapshot_of(&self, slot: &Slot<S::Output>, from_cache: bool) -> FeedSnapshot<S::Output> {
        let usable = slot.data.is_some()
            && slot
                .age()
                .is_some_and(|age| age <= self.options.cache_time);
        FeedSnapshot {
            data: slot.data.clone(),
            loading: slot.blocking_fetches > 0 && !usable,
            refreshing: slot.refreshing,
            is_stale: slot
                .age()
                .is_none_or(|age| age > self.options.stale_time),
            error: slot.error.clone(),
            fetched_at: slot.fetched_at,
            from_cache,
        }
    }
}

/// Calls [`SwrCache::refresh`] every `interval` until `shutdown` flips.
pub fn spawn_auto_refresh<S: FeedSource>(
    cache: Arc<SwrCache<S>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    assert!(!interval.is_zero(), "Auto refresh interval must be positive");
    tokio::spawn(async move {
        info!("Starting feed auto refresh every {}ms", interval.as_millis());
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    match changed {
                        Ok(_) => {
                            if *shutdown.borrow() {
                                info!("Feed auto refresh shutdown signal received");
                                break;
                            }
                        }
                        Err(_) => {
                            warn!("Shutdown channel closed unexpectedly. Stopping feed auto refresh");
                            break;
                        }
                    }
                }
                _ = sleep(interval) => {
                    if let Err(err) = cache.refresh().await {
                        warn!("Scheduled feed refresh failed: {err}");
                    }
                }
            }
        }
    })
}
