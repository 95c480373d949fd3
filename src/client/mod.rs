//! HTTP client for the public listing API, usable as a [`FeedSource`] so a
//! consumer gets the same stale-while-revalidate behaviour as the server.

mod fallback;

use std::time::Duration;

use anyhow::{Context, Result, bail, ensure};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::catalog::is_valid_slug;
use crate::config::FeedConfig;
use crate::feed::FeedSource;
use crate::models::airdrop::{AirdropView, ListingResponse};

pub use fallback::fallback_listing;

#[derive(Debug, Clone)]
pub struct AirdropFeedClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct DetailBody {
    success: bool,
    data: AirdropView,
}

impl AirdropFeedClient {
    pub fn new(base_url: &str, timeout: Duration, page_size: u64) -> Result<Self> {
        assert!(
            timeout >= Duration::from_millis(100),
            "Timeout below 100ms is unsafe"
        );
        assert!(
            (1..=100).contains(&page_size),
            "Feed page size must be between 1 and 100"
        );
        let base_url = base_url.trim().trim_end_matches('/');
        ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "Feed base URL must be an http(s) URL: {base_url}"
        );

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| format!("Failed to build feed client for {base_url}"))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
            page_size,
        })
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        Self::new(&config.base_url, config.request_timeout(), config.page_size)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, u64)]) -> Result<T> {
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            bail!("{url} answered {status}: {reason}");
        }
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));
        ensure!(is_json, "{url} did not answer with JSON");

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to decode response from {url}"))
    }

    /// One page of the default listing, starting at `offset`.
    pub async fn fetch_page(&self, offset: u64) -> Result<ListingResponse> {
        let url = format!("{}/api/airdrops", self.base_url);
        let listing: ListingResponse = self
            .get_json(&url, &[("limit", self.page_size), ("offset", offset)])
            .await?;
        ensure!(listing.success, "Listing response reported failure");
        ensure!(
            listing.data.len() as u64 <= self.page_size,
            "Listing returned more items than requested"
        );
        debug!(
            "Fetched {} airdrops from {url} ({:?})",
            listing.data.len(),
            listing.data_source
        );
        Ok(listing)
    }

    pub async fn fetch_airdrop(&self, id_or_slug: &str) -> Result<AirdropView> {
        let key = id_or_slug.trim();
        ensure!(
            key.parse::<i32>().is_ok() || is_valid_slug(key),
            "Not an airdrop id or slug: {key:?}"
        );
        let url = format!("{}/api/airdrops/{key}", self.base_url);
        let body: DetailBody = self.get_json(&url, &[]).await?;
        ensure!(body.success, "Airdrop response reported failure");
        Ok(body.data)
    }

    /// Like [`fetch_page`](Self::fetch_page), but answers with the canned
    /// fallback listing when the API is unreachable or misbehaves.
    pub async fn listing_or_fallback(&self, offset: u64) -> ListingResponse {
        match self.fetch_page(offset).await {
            Ok(listing) => listing,
            Err(err) => {
                warn!("Using fallback listing: {err:#}");
                fallback_listing()
            }
        }
    }
}

/// First page of the listing as seen through [`AirdropFeedClient`].
pub struct HttpFeedSource {
    client: AirdropFeedClient,
    use_fallback: bool,
}

impl HttpFeedSource {
    pub fn new(client: AirdropFeedClient) -> Self {
        Self {
            client,
            use_fallback: false,
        }
    }

    /// Fetch failures yield the fallback listing instead of an error.
    pub fn with_fallback(mut self) -> Self {
        self.use_fallback = true;
        self
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    type Output = ListingResponse;

    async fn fetch(&self) -> Result<ListingResponse> {
        if self.use_fallback {
            return Ok(self.client.listing_or_fallback(0).await);
        }
        self.client.fetch_page(0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use crate::feed::{FeedOptions, SwrCache};
    use crate::http::router as app_router;
    use crate::models::airdrop::DataSource;
    use crate::state::AppState;
    use crate::store::airdrops::create_airdrop;
    use crate::testing::{sample_draft, test_state};
    use tokio::net::TcpListener;

    async fn serve(state: AppState) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let app = app_router(state);
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });
        address
    }

    fn client_for(address: SocketAddr) -> AirdropFeedClient {
        let config = FeedConfig {
            base_url: format!("http://{address}/"),
            request_timeout_ms: 5_000,
            page_size: 12,
        };
        AirdropFeedClient::from_config(&config).unwrap()
    }

    #[test]
    fn from_config_uses_feed_section() {
        let mut config = crate::testing::test_config();
        config.feed.base_url = "https://feed.example.com/".to_string();
        let client = AirdropFeedClient::from_config(&config.feed).unwrap();
        assert_eq!(client.base_url(), "https://feed.example.com");
        assert_eq!(client.page_size, config.feed.page_size);

        config.feed.base_url = "feed.example.com".to_string();
        assert!(AirdropFeedClient::from_config(&config.feed).is_err());
    }

    #[test]
    fn rejects_non_http_base_urls() {
        assert!(AirdropFeedClient::new("ftp://example.com", Duration::from_secs(1), 12).is_err());
    }

    #[tokio::test]
    async fn reads_listing_and_detail_from_a_live_server() {
        let state = test_state().await;
        let database = state.database().unwrap().clone();
        create_airdrop(&database, &sample_draft("Remote One")).await.unwrap();
        create_airdrop(&database, &sample_draft("Remote Two")).await.unwrap();
        let client = client_for(serve(state).await);
        assert!(!client.base_url().ends_with('/'));

        let listing = client.fetch_page(0).await.unwrap();
        assert_eq!(listing.data.len(), 2);
        assert_eq!(listing.stats.total, 2);
        assert_ne!(listing.data_source, DataSource::Fallback);

        let detail = client.fetch_airdrop("remote-one").await.unwrap();
        assert_eq!(detail.summary.name, "Remote One");
        assert_eq!(detail.steps.len(), 2);

        let missing = client.fetch_airdrop("9999").await.unwrap_err();
        assert!(missing.to_string().contains("404"));
        assert!(client.fetch_airdrop("../admin").await.is_err());
    }

    #[tokio::test]
    async fn swr_cache_over_http() {
        let state = test_state().await;
        let database = state.database().unwrap().clone();
        create_airdrop(&database, &sample_draft("Cached Remote")).await.unwrap();
        let client = client_for(serve(state).await);

        let cache = SwrCache::new(HttpFeedSource::new(client), FeedOptions::default());
        let first = cache.read().await.unwrap();
        assert!(!first.loading && !first.from_cache);
        assert_eq!(first.data.unwrap().data[0].name, "Cached Remote");

        let second = cache.read().await.unwrap();
        assert!(second.from_cache);
        assert!(!second.is_stale);
    }

    #[tokio::test]
    async fn unreachable_api_falls_back() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);
        let client = client_for(address);

        assert!(client.fetch_page(0).await.is_err());
        let listing = client.listing_or_fallback(0).await;
        assert_eq!(listing.data_source, DataSource::Fallback);
        assert_eq!(listing.data[0].name, "LayerZero Airdrop");

        let source = HttpFeedSource::new(client).with_fallback();
        let fetched = source.fetch().await.unwrap();
        assert_eq!(fetched.data.len(), 2);
    }
}
