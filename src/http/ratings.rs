use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::models::rating::{RatingRequest, RatingResponse};
use crate::state::AppState;
use crate::store::ratings::{ensure_airdrop_exists, rating_stats, submit_rating, user_rating};

use super::{ApiJson, ClientIp, HttpError};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id_or_slug}/rating",
        get(get_rating).post(post_rating).put(post_rating),
    )
}

fn parse_airdrop_id(raw: &str) -> Result<i32, HttpError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| HttpError::bad_request("Invalid airdrop ID"))
}

async fn get_rating(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ClientIp(ip): ClientIp,
) -> Result<Json<RatingResponse>, HttpError> {
    if !state.rating_reads.check(&ip).await.allowed {
        return Err(HttpError::too_many_requests(
            "Too many requests. Please try again later.",
        ));
    }
    let database = state.database()?;
    let airdrop_id = parse_airdrop_id(&id)?;
    ensure_airdrop_exists(database, airdrop_id)
        .await
        .map_err(|err| HttpError::store("Failed to get rating data", err))?;

    let stats = rating_stats(database, airdrop_id)
        .await
        .map_err(|err| HttpError::internal("Failed to get rating data", err))?;
    let mine = user_rating(database, airdrop_id, &ip)
        .await
        .map_err(|err| HttpError::internal("Failed to get rating data", err))?;
    Ok(Json(RatingResponse {
        success: true,
        user_rating: mine,
        stats,
        message: None,
    }))
}

async fn post_rating(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    ApiJson(body): ApiJson<RatingRequest>,
) -> Result<Json<RatingResponse>, HttpError> {
    if !state.rating_writes.check(&ip).await.allowed {
        return Err(HttpError::too_many_requests(
            "Too many rating submissions. Please try again later.",
        ));
    }
    let database = state.database()?;
    let airdrop_id = parse_airdrop_id(&id)?;
    let rating = match body.rating {
        None => return Err(HttpError::bad_request("rating is required")),
        Some(value @ 1..=5) => value as i32,
        Some(_) => {
            return Err(HttpError::bad_request(
                "Rating must be a number between 1 and 5",
            ));
        }
    };
    let user_agent = headers.get(USER_AGENT).and_then(|value| value.to_str().ok());

    let stats = submit_rating(database, airdrop_id, &ip, rating, user_agent)
        .await
        .map_err(|err| HttpError::store("Failed to submit rating", err))?;
    state.cache.invalidate_lookups();
    info!("Airdrop {airdrop_id} rated {rating} by {ip}");

    Ok(Json(RatingResponse {
        success: true,
        user_rating: Some(rating),
        stats,
        message: Some("Rating submitted successfully".to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use crate::http::router as app_router;
    use crate::store::airdrops::create_airdrop;
    use crate::testing::{request, sample_draft, send, test_state};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn submit_then_read_back() {
        let state = test_state().await;
        let database = state.database().unwrap().clone();
        let created = create_airdrop(&database, &sample_draft("Rated Drop")).await.unwrap();
        let app = app_router(state);
        let uri = format!("/api/airdrops/{}/rating", created.id());

        let (status, body) =
            send(&app, request(Method::POST, &uri, Some(json!({ "rating": 4 })))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userRating"], 4);
        assert_eq!(body["stats"]["totalRatings"], 1);

        // same client ip, so this replaces the first rating
        let (status, body) =
            send(&app, request(Method::PUT, &uri, Some(json!({ "rating": 2 })))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["totalRatings"], 1);
        assert_eq!(body["stats"]["averageRating"], 2.0);

        let (status, body) = send(&app, request(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userRating"], 2);
        assert_eq!(body["stats"]["distribution"]["2"], 1);
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let state = test_state().await;
        let database = state.database().unwrap().clone();
        let created = create_airdrop(&database, &sample_draft("Strict")).await.unwrap();
        let app = app_router(state);
        let uri = format!("/api/airdrops/{}/rating", created.id());

        let (status, body) =
            send(&app, request(Method::POST, &uri, Some(json!({ "rating": 9 })))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Rating must be a number between 1 and 5");

        let (status, _) = send(&app, request(Method::POST, &uri, Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            request(Method::POST, "/api/airdrops/999/rating", Some(json!({ "rating": 3 }))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn writes_are_rate_limited_per_ip() {
        let state = test_state().await;
        let database = state.database().unwrap().clone();
        let created = create_airdrop(&database, &sample_draft("Busy")).await.unwrap();
        let app = app_router(state);
        let uri = format!("/api/airdrops/{}/rating", created.id());

        for _ in 0..5 {
            let (status, _) =
                send(&app, request(Method::POST, &uri, Some(json!({ "rating": 5 })))).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) =
            send(&app, request(Method::POST, &uri, Some(json!({ "rating": 5 })))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["success"], false);
    }
}
