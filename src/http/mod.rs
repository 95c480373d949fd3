use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::state::{AppState, NotConfigured, Persistence};
use crate::store::StoreError;
use crate::validation::FieldErrors;

mod admin;
mod airdrops;
mod extract;
mod ratings;

pub use extract::{ApiJson, ClientIp};

pub fn router(state: AppState) -> Router {
    assert!(
        state.start_time.elapsed() < Duration::from_secs(86_400),
        "Application uptime exceeds 24 hours before router creation"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let public_router = airdrops::router().merge(ratings::router());
    let admin_router = admin::router(state.clone());
    let uploads = ServeDir::new(&state.uploads.directory);
    Router::new()
        .route("/health", get(health_live))
        .route("/health/ready", get(health_ready))
        .nest("/api/airdrops", public_router)
        .nest("/api/admin", admin_router)
        .nest_service(&state.uploads.public_path, uploads)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_live(State(state): State<AppState>) -> Result<Json<HealthResponse>, HttpError> {
    let uptime = state.start_time.elapsed().as_secs();
    assert!(
        uptime <= 31_536_000,
        "Uptime exceeds one year without restart"
    );
    let response = HealthResponse {
        status: "live",
        uptime_seconds: uptime,
    };
    Ok(Json(response))
}

async fn health_ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, HttpError> {
    let database = match &state.persistence {
        Persistence::Connected(connection) => {
            connection
                .ping()
                .await
                .map_err(|err| HttpError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()))?;
            "connected".to_string()
        }
        Persistence::Unconfigured { reason } => format!("not configured: {reason}"),
    };

    let home_feed = match &state.cache.home_feed {
        Some(feed) => {
            let snapshot = feed.snapshot().await;
            Some(HomeFeedSummary {
                cached: snapshot.data.is_some(),
                is_stale: snapshot.is_stale,
                refreshing: snapshot.refreshing,
                last_error: snapshot.error,
            })
        }
        None => None,
    };

    let response = ReadyResponse {
        status: "ready",
        database,
        cache_entries: CacheSummary {
            details: state.cache.details.entry_count(),
            listings: state.cache.listings.entry_count(),
        },
        home_feed,
    };
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    status: &'static str,
    database: String,
    cache_entries: CacheSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    home_feed: Option<HomeFeedSummary>,
}

#[derive(Debug, Serialize)]
struct CacheSummary {
    details: u64,
    listings: u64,
}

#[derive(Debug, Serialize)]
struct HomeFeedSummary {
    cached: bool,
    is_stale: bool,
    refreshing: bool,
    last_error: Option<String>,
}

/// `{ success: true, data, message? }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: None,
        })
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: Some(message.into()),
        })
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
    details: Option<BTreeMap<String, String>>,
    hint: Option<String>,
}

impl HttpError {
    pub fn new(status: StatusCode, message: String) -> Self {
        assert!(status != StatusCode::OK, "Error status cannot be 200");
        assert!(!message.is_empty(), "Error message cannot be empty");
        Self {
            status,
            message,
            details: None,
            hint: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message.into())
    }

    pub fn not_configured() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Database not configured".to_string(),
        )
        .with_hint("Set AIRDROP_API__DATABASE__URL or DATABASE_URL and restart the server")
    }

    /// 400 naming the first failing field, with every field error in `details`.
    pub fn validation(errors: FieldErrors) -> Self {
        let message = errors
            .first()
            .map(|(_, message)| message.to_string())
            .unwrap_or_else(|| "Validation failed".to_string());
        Self::new(StatusCode::BAD_REQUEST, message).with_details(errors.into_map())
    }

    pub fn internal(context: &str, cause: impl Display) -> Self {
        error!("{context}: {cause}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
            .with_detail("cause", cause.to_string())
    }

    pub fn store(context: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            StoreError::Conflict { field, ref value } => {
                let detail = format!("{field} '{value}' is already in use");
                Self::new(StatusCode::CONFLICT, err.to_string()).with_detail(field, detail)
            }
            StoreError::Rejected(message) => Self::new(StatusCode::BAD_REQUEST, message),
            StoreError::Encode(_) | StoreError::Database(_) => Self::internal(context, err),
        }
    }

    pub fn with_details(mut self, details: BTreeMap<String, String>) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<NotConfigured> for HttpError {
    fn from(_: NotConfigured) -> Self {
        Self::not_configured()
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        info!("HTTP error {}: {}", self.status.as_u16(), self.message);
        let body = Json(ErrorBody {
            success: false,
            error: self.message,
            details: self.details,
            message: self.hint,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}
