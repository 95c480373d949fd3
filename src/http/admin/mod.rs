//! `/api/admin` routes. When an admin token is configured every route here
//! requires it as a bearer token or an `admin_token` cookie.

use axum::Router;
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use serde::Deserialize;
use tracing::warn;

use crate::state::AppState;

use super::HttpError;

mod airdrops;
mod backup;
mod categories;
mod dashboard;
mod env;
mod settings;
mod upload;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/airdrops", airdrops::router())
        .nest("/categories", categories::router())
        .merge(settings::router())
        .merge(env::router())
        .merge(backup::router())
        .merge(upload::router(state.uploads.max_bytes))
        .merge(dashboard::router())
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(next.run(request).await);
    };
    let presented = bearer_token(request.headers()).or_else(|| cookie_token(request.headers()));
    match presented {
        Some(token) if tokens_match(token.as_bytes(), expected.as_bytes()) => {
            Ok(next.run(request).await)
        }
        _ => {
            warn!("Rejected admin request to {}", request.uri().path());
            Err(HttpError::new(
                StatusCode::UNAUTHORIZED,
                "Unauthorized".to_string(),
            ))
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|pair| pair.trim().strip_prefix("admin_token="))
}

fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Ids arrive as numbers or as their string form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum IdValue {
    Number(i64),
    Text(String),
}

pub(crate) fn parse_ids(values: &[IdValue]) -> Result<Vec<i32>, HttpError> {
    values
        .iter()
        .map(|value| {
            let parsed = match value {
                IdValue::Number(number) => i32::try_from(*number).ok(),
                IdValue::Text(text) => text.trim().parse::<i32>().ok(),
            };
            parsed.ok_or_else(|| HttpError::bad_request("Invalid id in selection"))
        })
        .collect()
}

pub(crate) fn parse_id(raw: &str, entity: &str) -> Result<i32, HttpError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| HttpError::bad_request(format!("Invalid {entity} ID")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::http::router as app_router;
    use crate::state::Persistence;
    use crate::testing::{TEST_ADMIN_TOKEN, memory_database, request, send};
    use axum::http::{HeaderValue, Method};

    async fn guarded_app() -> Router {
        let mut config = ApiConfig::default();
        config.admin.token = Some(TEST_ADMIN_TOKEN.to_string());
        config.validate().unwrap();
        let state = AppState::new(&config, Persistence::Connected(memory_database().await));
        app_router(state)
    }

    #[tokio::test]
    async fn token_required_when_configured() {
        let app = guarded_app().await;
        let (status, body) = send(&app, request(Method::GET, "/api/admin/settings", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");

        let mut bearer = request(Method::GET, "/api/admin/settings", None);
        bearer.headers_mut().insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {TEST_ADMIN_TOKEN}")).unwrap(),
        );
        let (status, _) = send(&app, bearer).await;
        assert_eq!(status, StatusCode::OK);

        let mut cookie = request(Method::GET, "/api/admin/settings", None);
        cookie.headers_mut().insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; admin_token={TEST_ADMIN_TOKEN}")).unwrap(),
        );
        let (status, _) = send(&app, cookie).await;
        assert_eq!(status, StatusCode::OK);

        // public routes stay open
        let (status, _) = send(&app, request(Method::GET, "/api/airdrops", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn ids_accept_numbers_and_strings() {
        let values: Vec<IdValue> = serde_json::from_str(r#"[1, "2", " 3 "]"#).unwrap();
        assert_eq!(parse_ids(&values).unwrap(), vec![1, 2, 3]);
        let bad: Vec<IdValue> = serde_json::from_str(r#"["x"]"#).unwrap();
        assert!(parse_ids(&bad).is_err());
        assert!(!tokens_match(b"abc", b"abd"));
        assert!(tokens_match(b"abc", b"abc"));
    }
}
