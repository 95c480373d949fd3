use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::http::airdrops::ListingParams;
use crate::http::{ApiJson, Envelope, HttpError};
use crate::models::airdrop::{AirdropView, ListingStats, Pagination, StepView};
use crate::state::AppState;
use crate::store::activity::record_activity;
use crate::store::airdrops::{
    BulkAction, apply_bulk, create_airdrop, delete_airdrop, find_airdrop, list_airdrops,
    load_views, remove_step, reorder_steps, update_airdrop,
};
use crate::validation::{AirdropDraft, AirdropPayload, FieldErrors, validate_airdrop};

use super::{IdValue, parse_id, parse_ids};

const ADMIN_PAGE_SIZE: u64 = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_admin).post(create_or_bulk))
        .route("/bulk", post(bulk))
        .route("/validate", post(validate_only))
        .route(
            "/{id}",
            get(get_airdrop).put(update).delete(remove),
        )
        .route("/{id}/steps/order", put(reorder))
        .route("/{id}/steps/{step_number}", delete(delete_step))
}

#[derive(Debug, Serialize)]
struct AdminListing {
    success: bool,
    data: Vec<AirdropView>,
    stats: ListingStats,
    pagination: Pagination,
}

async fn list_admin(
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> Result<Json<AdminListing>, HttpError> {
    let database = state.database()?;
    let query = params.into_query(ADMIN_PAGE_SIZE)?;
    let page = list_airdrops(database, &query)
        .await
        .map_err(|err| HttpError::internal("Failed to fetch airdrops", err))?;
    let ids: Vec<i32> = page.items.iter().map(|item| item.id).collect();
    let mut views = load_views(database, &ids)
        .await
        .map_err(|err| HttpError::internal("Failed to fetch airdrops", err))?;
    // keep the listing's sort order
    views.sort_by_key(|view| ids.iter().position(|id| *id == view.id()));
    Ok(Json(AdminListing {
        success: true,
        data: views,
        stats: page.stats,
        pagination: page.pagination,
    }))
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    action: String,
    ids: Vec<IdValue>,
}

#[derive(Debug, Serialize)]
struct BulkResponse {
    success: bool,
    action: BulkAction,
    affected: u64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Vec<AirdropView>>,
}

/// `POST /api/admin/airdrops` creates, unless the body is a bulk request
/// (`{ action, ids }`).
async fn create_or_bulk(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), HttpError> {
    let is_bulk = body.get("action").is_some_and(Value::is_string)
        && body.get("ids").is_some_and(Value::is_array);
    if is_bulk {
        let request: BulkRequest = serde_json::from_value(body)
            .map_err(|err| HttpError::bad_request("Invalid bulk request").with_detail("cause", err.to_string()))?;
        let Json(response) = run_bulk(&state, request).await?;
        return Ok((StatusCode::OK, Json(json!(response))));
    }

    let payload: AirdropPayload = serde_json::from_value(body).map_err(|err| {
        HttpError::bad_request("Invalid airdrop payload").with_detail("cause", err.to_string())
    })?;
    let draft = validate_airdrop(&payload).map_err(HttpError::validation)?;
    let database = state.database()?;
    let created = create_airdrop(database, &draft)
        .await
        .map_err(|err| HttpError::store("Failed to create airdrop", err))?;
    state.cache.invalidate_airdrops().await;
    let Json(envelope) = Envelope::with_message(created, "Airdrop created successfully");
    Ok((StatusCode::CREATED, Json(json!(envelope))))
}

async fn bulk(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BulkRequest>,
) -> Result<Json<BulkResponse>, HttpError> {
    run_bulk(&state, request).await
}

async fn run_bulk(state: &AppState, request: BulkRequest) -> Result<Json<BulkResponse>, HttpError> {
    let action = BulkAction::parse(&request.action)
        .ok_or_else(|| HttpError::bad_request(format!("Invalid bulk action: {}", request.action)))?;
    let ids = parse_ids(&request.ids)?;
    let database = state.database()?;
    let outcome = apply_bulk(database, action, &ids)
        .await
        .map_err(|err| HttpError::store("Failed to perform bulk action", err))?;
    if action.mutates() {
        state.cache.invalidate_airdrops().await;
        record_activity(
            database,
            "bulk_action",
            json!({ "action": action.as_str(), "ids": ids, "affected": outcome.affected }),
        )
        .await;
    }
    Ok(Json(BulkResponse {
        success: true,
        action,
        affected: outcome.affected,
        message: outcome.message,
        data: outcome.exported,
    }))
}

#[derive(Debug, Serialize)]
struct ValidationResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<AirdropDraft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

/// Dry run of the create/edit validators. Never touches the database.
async fn validate_only(ApiJson(payload): ApiJson<AirdropPayload>) -> Json<ValidationResponse> {
    match validate_airdrop(&payload) {
        Ok(draft) => Json(ValidationResponse {
            success: true,
            data: Some(draft),
            errors: None,
        }),
        Err(errors) => Json(ValidationResponse {
            success: false,
            data: None,
            errors: Some(errors),
        }),
    }
}

async fn get_airdrop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<AirdropView>>, HttpError> {
    let database = state.database()?;
    let id = parse_id(&id, "airdrop")?;
    let view = find_airdrop(database, id)
        .await
        .map_err(|err| HttpError::store("Failed to fetch airdrop", err))?;
    Ok(Envelope::ok(view))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<AirdropPayload>,
) -> Result<Json<Envelope<AirdropView>>, HttpError> {
    let draft = validate_airdrop(&payload).map_err(HttpError::validation)?;
    let database = state.database()?;
    let id = parse_id(&id, "airdrop")?;
    let updated = update_airdrop(database, id, &draft)
        .await
        .map_err(|err| HttpError::store("Failed to update airdrop", err))?;
    state.cache.invalidate_airdrops().await;
    Ok(Envelope::with_message(updated, "Airdrop updated successfully"))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<AirdropView>>, HttpError> {
    let database = state.database()?;
    let id = parse_id(&id, "airdrop")?;
    let deleted = delete_airdrop(database, id)
        .await
        .map_err(|err| HttpError::store("Failed to delete airdrop", err))?;
    state.cache.invalidate_airdrops().await;
    info!("Admin deleted airdrop {}", deleted.summary.slug);
    Ok(Envelope::with_message(deleted, "Airdrop deleted successfully"))
}

#[derive(Debug, Deserialize)]
struct StepOrderRequest {
    /// Current step numbers in their new order
    order: Vec<usize>,
}

async fn reorder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<StepOrderRequest>,
) -> Result<Json<Envelope<Vec<StepView>>>, HttpError> {
    let database = state.database()?;
    let id = parse_id(&id, "airdrop")?;
    let positions = request
        .order
        .iter()
        .map(|number| number.checked_sub(1))
        .collect::<Option<Vec<usize>>>()
        .ok_or_else(|| HttpError::bad_request("Step numbers start at 1"))?;
    let steps = reorder_steps(database, id, &positions)
        .await
        .map_err(|err| HttpError::store("Failed to reorder steps", err))?;
    state.cache.invalidate_airdrops().await;
    Ok(Envelope::with_message(steps, "Steps reordered"))
}

async fn delete_step(
    State(state): State<AppState>,
    Path((id, step_number)): Path<(String, i32)>,
) -> Result<Json<Envelope<Vec<StepView>>>, HttpError> {
    let database = state.database()?;
    let id = parse_id(&id, "airdrop")?;
    let steps = remove_step(database, id, step_number)
        .await
        .map_err(|err| HttpError::store("Failed to remove step", err))?;
    state.cache.invalidate_airdrops().await;
    Ok(Envelope::with_message(steps, "Step removed"))
}

#[cfg(test)]
mod tests {
    use crate::http::router as app_router;
    use crate::store::airdrops::create_airdrop;
    use crate::testing::{request, sample_body, sample_draft, send, test_state, unconfigured_state};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn create_validates_then_persists() {
        let app = app_router(test_state().await);

        let mut missing = sample_body("Missing Name");
        missing.as_object_mut().unwrap().remove("name");
        let (status, body) =
            send(&app, request(Method::POST, "/api/admin/airdrops", Some(missing))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "name is required");
        assert_eq!(body["details"]["name"], "name is required");

        let (status, body) = send(
            &app,
            request(Method::POST, "/api/admin/airdrops", Some(sample_body("zkSync Era"))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["slug"], "zksync-era");
        assert_eq!(body["data"]["steps"][1]["stepNumber"], 2);
        assert_eq!(body["message"], "Airdrop created successfully");

        let (status, body) = send(
            &app,
            request(Method::POST, "/api/admin/airdrops", Some(sample_body("zkSync  Era"))),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["details"]["slug"].is_string());
    }

    #[tokio::test]
    async fn invalid_payload_fails_before_the_database() {
        // no database at all: a validation failure must still be a 400
        let app = app_router(unconfigured_state());
        let (status, body) = send(
            &app,
            request(Method::POST, "/api/admin/airdrops", Some(json!({ "description": "short" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "name is required");

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/airdrops/validate",
                Some(sample_body("Dry Run")),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["slug"], "dry-run");
    }

    #[tokio::test]
    async fn validate_reports_field_paths() {
        let app = app_router(unconfigured_state());
        let mut invalid = sample_body("Paths");
        invalid["socialLinks"]["twitter"] = json!("not a url");
        invalid["startDate"] = json!("01/02/2026");
        let (status, body) = send(
            &app,
            request(Method::POST, "/api/admin/airdrops/validate", Some(invalid)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"]["socialLinks.twitter"], "Invalid URL");
        assert_eq!(body["errors"]["startDate"], "Start date must use YYYY-MM-DD");
    }

    #[tokio::test]
    async fn update_delete_and_step_routes() {
        let state = test_state().await;
        let database = state.database().unwrap().clone();
        let mut draft = sample_draft("Movable");
        draft.steps.push("Third step", "", false);
        let created = create_airdrop(&database, &draft).await.unwrap();
        let app = app_router(state);
        let uri = format!("/api/admin/airdrops/{}", created.id());

        let mut edited = sample_body("Movable");
        edited["status"] = json!("ended");
        edited["steps"] = json!(["Only step"]);
        let (status, body) = send(&app, request(Method::PUT, &uri, Some(edited))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ended");
        assert_eq!(body["data"]["steps"].as_array().unwrap().len(), 1);

        let mut three = sample_body("Movable");
        three["steps"] = json!(["A", "B", "C"]);
        send(&app, request(Method::PUT, &uri, Some(three))).await;

        let (status, body) = send(
            &app,
            request(
                Method::PUT,
                &format!("{uri}/steps/order"),
                Some(json!({ "order": [3, 1, 2] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|step| step["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["C", "A", "B"]);

        let (status, body) =
            send(&app, request(Method::DELETE, &format!("{uri}/steps/2"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][1]["stepNumber"], 2);
        assert_eq!(body["data"][1]["title"], "B");

        let (status, _) = send(
            &app,
            request(Method::DELETE, &format!("{uri}/steps/-2147483648"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, request(Method::DELETE, &uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, request(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bulk_through_both_entry_points() {
        let state = test_state().await;
        let database = state.database().unwrap().clone();
        let mut ids = Vec::new();
        for name in ["Bulk A", "Bulk B", "Bulk C"] {
            ids.push(create_airdrop(&database, &sample_draft(name)).await.unwrap().id());
        }
        let app = app_router(state);

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/airdrops",
                Some(json!({ "action": "confirm", "ids": [ids[0].to_string(), ids[1]] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Successfully confirmed 2 airdrops");

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/airdrops/bulk",
                Some(json!({ "action": "delete", "ids": ids })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["affected"], 3);
        assert!(body["message"].as_str().unwrap().contains('3'));

        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/airdrops/bulk",
                Some(json!({ "action": "archive", "ids": [1] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, listing) = send(&app, request(Method::GET, "/api/admin/airdrops", None)).await;
        assert_eq!(listing["pagination"]["total"], 0);
        assert_eq!(listing["pagination"]["limit"], 20);
    }
}
