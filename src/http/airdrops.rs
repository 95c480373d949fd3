use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::airdrop::{AirdropStatus, AirdropView, DataSource, ListingResponse};
use crate::state::AppState;
use crate::store::airdrops::{
    DEFAULT_PAGE_SIZE, ListingQuery, MAX_PAGE_SIZE, SortDirection, SortField, find_airdrop,
    find_airdrop_by_slug, list_airdrops,
};

use super::{Envelope, HttpError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_public))
        .route("/{id_or_slug}", get(get_airdrop))
}

/// Raw listing query string. Numbers are parsed leniently: anything that is
/// not a positive integer falls back to the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListingParams {
    pub fn into_query(self, default_limit: u64) -> Result<ListingQuery, HttpError> {
        let page = parse_positive(self.page.as_deref()).unwrap_or(1);
        let limit = parse_positive(self.limit.as_deref())
            .unwrap_or(default_limit)
            .min(MAX_PAGE_SIZE);
        let status = match filter_value(self.status) {
            Some(raw) => Some(
                AirdropStatus::parse(&raw)
                    .ok_or_else(|| HttpError::bad_request(format!("Invalid status filter: {raw}")))?,
            ),
            None => None,
        };
        let mut query = ListingQuery {
            page,
            limit,
            offset: None,
            search: self
                .search
                .map(|term| term.trim().to_string())
                .filter(|term| !term.is_empty()),
            category: filter_value(self.category),
            status,
            sort_by: self
                .sort_by
                .as_deref()
                .and_then(SortField::parse)
                .unwrap_or_default(),
            sort_order: self
                .sort_order
                .as_deref()
                .and_then(SortDirection::parse)
                .unwrap_or_default(),
        };
        if let Some(offset) = self.offset.as_deref().and_then(|raw| raw.trim().parse::<u64>().ok()) {
            query = query.with_offset(offset);
        }
        Ok(query)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

/// Blank and `all` mean no filter.
fn filter_value(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("all"))
}

async fn list_public(
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> Result<Json<ListingResponse>, HttpError> {
    let database = state.database()?;
    let query = params.into_query(DEFAULT_PAGE_SIZE)?;

    if let Some(feed) = &state.cache.home_feed {
        if feed.source().query() == &query {
            match feed.read().await {
                Ok(snapshot) => {
                    if let Some(page) = snapshot.data {
                        let source = if snapshot.from_cache {
                            DataSource::Cache
                        } else {
                            DataSource::Database
                        };
                        return Ok(Json(ListingResponse::from_page(&page, source)));
                    }
                }
                Err(err) => warn!("Home feed unavailable, querying directly: {err}"),
            }
        }
    }

    if let Some(cached) = state.cache.listings.get(&query).await {
        debug!("Listing served from cache");
        return Ok(Json(ListingResponse::from_page(&cached, DataSource::Cache)));
    }

    let page = list_airdrops(database, &query)
        .await
        .map_err(|err| HttpError::internal("Failed to fetch airdrops", err))?;
    let page = Arc::new(page);
    state.cache.listings.insert(query, Arc::clone(&page)).await;
    Ok(Json(ListingResponse::from_page(&page, DataSource::Database)))
}

async fn get_airdrop(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<Envelope<AirdropView>>, HttpError> {
    let database = state.database()?;
    let key = id_or_slug.trim().to_string();
    if let Some(cached) = state.cache.details.get(&key).await {
        return Ok(Envelope::ok((*cached).clone()));
    }

    let found = match key.parse::<i32>() {
        Ok(id) => find_airdrop(database, id).await,
        Err(_) => find_airdrop_by_slug(database, &key.to_lowercase()).await,
    };
    let view = found.map_err(|err| HttpError::store("Failed to fetch airdrop", err))?;
    state
        .cache
        .details
        .insert(key, Arc::new(view.clone()))
        .await;
    Ok(Envelope::ok(view))
}
