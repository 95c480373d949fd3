//! Shared fixtures for the inline test modules.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::config::ApiConfig;
use crate::state::{AppState, NOT_CONFIGURED_REASON, Persistence};
use crate::validation::{AirdropDraft, AirdropPayload, validate_airdrop};

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token-0123456789";

/// A fresh migrated SQLite database. One connection keeps `:memory:` shared.
pub async fn memory_database() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let database = Database::connect(options).await.expect("sqlite connects");
    migration::Migrator::up(&database, None)
        .await
        .expect("migrations apply");
    database
}

pub fn sample_body(name: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{name} rewards early users of the protocol"),
        "action": "Bridge and swap on mainnet",
        "category": "Latest",
        "status": "active",
        "difficulty": "Medium",
        "reward": "$500 - $2,000",
        "socialLinks": { "twitter": "https://twitter.com/example" },
        "about": { "overview": format!("Overview of {name}") },
        "steps": [
            "Connect a wallet",
            { "title": "Make a swap", "description": "Any pair works", "isRequired": true }
        ],
        "requirements": ["An EVM wallet"],
        "networks": ["Ethereum"]
    })
}

pub fn sample_payload(name: &str) -> AirdropPayload {
    serde_json::from_value(sample_body(name)).expect("sample payload deserializes")
}

pub fn sample_draft(name: &str) -> AirdropDraft {
    validate_airdrop(&sample_payload(name)).expect("sample payload is valid")
}

pub fn test_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.validate().expect("default config is valid");
    config
}

pub async fn test_state() -> AppState {
    AppState::new(&test_config(), Persistence::Connected(memory_database().await))
}

pub fn unconfigured_state() -> AppState {
    AppState::new(
        &test_config(),
        Persistence::Unconfigured {
            reason: NOT_CONFIGURED_REASON.to_string(),
        },
    )
}

pub fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7");
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds")
}

/// Sends one request through the router and decodes the JSON body
/// (`Value::Null` when the body is empty).
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is JSON")
    };
    (status, body)
}
