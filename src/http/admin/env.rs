use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::http::{ApiJson, HttpError};
use crate::state::AppState;
use crate::store::activity::record_activity;

/// Variables the admin surface may inspect and edit, with their descriptions.
const MANAGEABLE_VARS: [(&str, &str); 8] = [
    ("DATABASE_URL", "Database connection string"),
    ("AIRDROP_API__ADMIN__TOKEN", "Bearer token protecting the admin API"),
    ("AIRDROP_API__FEED__BASE_URL", "Base URL the feed client reads listings from"),
    ("AIRDROP_API__CACHE__AUTO_REFRESH_MS", "Home feed refresh interval in milliseconds"),
    ("SITE_URL", "Public URL of the site"),
    ("GA_ID", "Google Analytics tracking ID"),
    ("ADMIN_EMAIL", "Administrator email address"),
    ("RUST_LOG", "Log filter directives"),
];

const SENSITIVE_VARS: [&str; 2] = ["DATABASE_URL", "AIRDROP_API__ADMIN__TOKEN"];

pub fn router() -> Router<AppState> {
    Router::new().route("/env", get(list).post(update))
}

/// Keeps the first and last four characters of long values.
pub fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 8))
}

fn is_sensitive(key: &str) -> bool {
    SENSITIVE_VARS.contains(&key)
}

fn present(key: &str, value: Option<&str>) -> Option<String> {
    value.map(|value| {
        if is_sensitive(key) {
            mask_value(value)
        } else {
            value.to_string()
        }
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvVarView {
    key: &'static str,
    value: Option<String>,
    is_sensitive: bool,
    is_set: bool,
    description: &'static str,
    /// Edit waiting for a restart. `Some(None)` marks a pending removal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pending: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
struct EnvSummary {
    total: usize,
    set: usize,
    sensitive: usize,
    pending: usize,
}

#[derive(Debug, Serialize)]
struct EnvListing {
    success: bool,
    data: BTreeMap<&'static str, EnvVarView>,
    info: EnvSummary,
}

async fn list(State(state): State<AppState>) -> Json<EnvListing> {
    let overrides = state.env_overrides.read().await;
    let mut data = BTreeMap::new();
    for (key, description) in MANAGEABLE_VARS {
        let current = std::env::var(key).ok().filter(|value| !value.is_empty());
        let pending = overrides
            .get(key)
            .map(|value| present(key, value.as_deref()));
        data.insert(
            key,
            EnvVarView {
                key,
                is_set: current.is_some(),
                value: present(key, current.as_deref()),
                is_sensitive: is_sensitive(key),
                description,
                pending,
            },
        );
    }
    let info = EnvSummary {
        total: data.len(),
        set: data.values().filter(|view| view.is_set).count(),
        sensitive: data.values().filter(|view| view.is_sensitive).count(),
        pending: overrides.len(),
    };
    Json(EnvListing {
        success: true,
        data,
        info,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EnvAction {
    Update,
    Delete,
}

#[derive(Debug, Deserialize)]
struct EnvUpdate {
    key: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default = "default_action")]
    action: EnvAction,
}

fn default_action() -> EnvAction {
    EnvAction::Update
}

#[derive(Debug, Serialize)]
struct EnvUpdateResponse {
    success: bool,
    message: String,
    note: &'static str,
}

/// Records an edit for the next restart. The running process environment is
/// never modified.
async fn update(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EnvUpdate>,
) -> Result<Json<EnvUpdateResponse>, HttpError> {
    let Some((key, _)) = MANAGEABLE_VARS
        .iter()
        .find(|(name, _)| *name == request.key)
    else {
        return Err(HttpError::bad_request("Environment variable not manageable"));
    };
    let (stored, verb) = match request.action {
        EnvAction::Update => {
            let value = request
                .value
                .ok_or_else(|| HttpError::bad_request("value is required"))?;
            (Some(value), "updated")
        }
        EnvAction::Delete => (None, "deleted"),
    };
    info!(
        "Environment variable {key} {verb}: {}",
        present(key, stored.as_deref()).unwrap_or_default()
    );
    state
        .env_overrides
        .write()
        .await
        .insert(key.to_string(), stored);

    if let Ok(database) = state.database() {
        record_activity(database, "env_var_updated", json!({ "key": key, "action": verb })).await;
    }
    Ok(Json(EnvUpdateResponse {
        success: true,
        message: format!("Environment variable {key} {verb} successfully"),
        note: "Changes will take effect after application restart",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::router as app_router;
    use crate::testing::{request, send, unconfigured_state};
    use axum::http::{Method, StatusCode};

    #[test]
    fn masking_keeps_edges_of_long_values() {
        assert_eq!(mask_value(""), "");
        assert_eq!(mask_value("secret"), "******");
        assert_eq!(
            mask_value("postgres://user:pw@db"),
            format!("post{}w@db", "*".repeat(13))
        );
    }

    #[tokio::test]
    async fn edits_are_pending_and_masked() {
        let app = app_router(unconfigured_state());
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/env",
                Some(json!({ "key": "AIRDROP_API__ADMIN__TOKEN", "value": "abcdefghijklmnop" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            "Environment variable AIRDROP_API__ADMIN__TOKEN updated successfully"
        );

        let (status, body) = send(&app, request(Method::GET, "/api/admin/env", None)).await;
        assert_eq!(status, StatusCode::OK);
        let token = &body["data"]["AIRDROP_API__ADMIN__TOKEN"];
        assert_eq!(token["isSensitive"], true);
        assert_eq!(token["pending"], "abcd********mnop");
        assert_eq!(body["info"]["total"], 8);
        assert_eq!(body["info"]["pending"], 1);

        let (status, _) = send(
            &app,
            request(Method::POST, "/api/admin/env", Some(json!({ "key": "PATH", "value": "/" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
