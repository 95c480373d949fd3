use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::http::{ApiJson, Envelope, HttpError};
use crate::models::airdrop::Pagination;
use crate::models::category::{CategoryPayload, CategoryView};
use crate::state::AppState;
use crate::store::categories::{
    DEFAULT_CATEGORY_PAGE_SIZE, bulk_delete_categories, create_category, delete_category,
    find_category, list_categories, update_category,
};
use crate::store::airdrops::MAX_PAGE_SIZE;
use crate::validation::validate_category;

use super::{IdValue, parse_id, parse_ids};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/bulk", post(bulk))
        .route("/{id}", get(show).put(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryQuery {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
}

#[derive(Debug, Serialize)]
struct CategoryListing {
    success: bool,
    data: Vec<CategoryView>,
    pagination: Pagination,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<CategoryListing>, HttpError> {
    let database = state.database()?;
    let positive = |raw: Option<&str>| {
        raw.and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|value| *value > 0)
    };
    let page = positive(query.page.as_deref()).unwrap_or(1);
    let limit = positive(query.limit.as_deref())
        .unwrap_or(DEFAULT_CATEGORY_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty());

    let result = list_categories(database, page, limit, search)
        .await
        .map_err(|err| HttpError::internal("Failed to fetch categories", err))?;
    Ok(Json(CategoryListing {
        success: true,
        data: result.items,
        pagination: Pagination::new(page, limit, result.total),
    }))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> Result<(StatusCode, Json<Envelope<CategoryView>>), HttpError> {
    let draft = validate_category(&payload).map_err(HttpError::validation)?;
    let database = state.database()?;
    let created = create_category(database, &draft)
        .await
        .map_err(|err| HttpError::store("Failed to create category", err))?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_message(created, "Category created successfully"),
    ))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<CategoryView>>, HttpError> {
    let database = state.database()?;
    let id = parse_id(&id, "category")?;
    let view = find_category(database, id)
        .await
        .map_err(|err| HttpError::store("Failed to fetch category", err))?;
    Ok(Envelope::ok(view))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<CategoryPayload>,
) -> Result<Json<Envelope<CategoryView>>, HttpError> {
    let draft = validate_category(&payload).map_err(HttpError::validation)?;
    let database = state.database()?;
    let id = parse_id(&id, "category")?;
    let updated = update_category(database, id, &draft)
        .await
        .map_err(|err| HttpError::store("Failed to update category", err))?;
    Ok(Envelope::with_message(updated, "Category updated successfully"))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<CategoryView>>, HttpError> {
    let database = state.database()?;
    let id = parse_id(&id, "category")?;
    let deleted = delete_category(database, id)
        .await
        .map_err(|err| HttpError::store("Failed to delete category", err))?;
    Ok(Envelope::with_message(deleted, "Category deleted successfully"))
}

#[derive(Debug, Deserialize)]
struct BulkCategoryRequest {
    action: String,
    ids: Vec<IdValue>,
}

#[derive(Debug, Serialize)]
struct BulkCategoryResponse {
    success: bool,
    affected: u64,
    message: String,
}

async fn bulk(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BulkCategoryRequest>,
) -> Result<Json<BulkCategoryResponse>, HttpError> {
    if request.action != "delete" {
        return Err(HttpError::bad_request(format!(
            "Invalid bulk action: {}",
            request.action
        )));
    }
    let ids = parse_ids(&request.ids)?;
    let database = state.database()?;
    let affected = bulk_delete_categories(database, &ids)
        .await
        .map_err(|err| HttpError::store("Failed to delete categories", err))?;
    Ok(Json(BulkCategoryResponse {
        success: true,
        affected,
        message: format!("Successfully deleted {affected} categories"),
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
    async fn crud_with_counts_and_conflicts() {
        let state = test_state().await;
        let database = state.database().unwrap().clone();
        create_airdrop(&database, &sample_draft("Counted")).await.unwrap();
        let app = app_router(state);

        let (status, body) = send(
            &app,
            request(Method::POST, "/api/admin/categories", Some(json!({ "name": "Latest" }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["color"], "#7cb342");
        assert_eq!(body["data"]["icon"], "folder");
        assert_eq!(body["data"]["airdropCount"], 1);
        let latest_id = body["data"]["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            request(Method::POST, "/api/admin/categories", Some(json!({ "name": "LATEST" }))),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/categories",
                Some(json!({ "name": "Bad", "color": "green" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["color"], "Invalid color format");

        let uri = format!("/api/admin/categories/{latest_id}");
        let (status, body) = send(&app, request(Method::DELETE, &uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("1 airdrops"));

        let (status, body) = send(
            &app,
            request(Method::PUT, &uri, Some(json!({ "name": "Newest", "color": "#FFAA00" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["airdropCount"], 0);

        let (status, _) = send(&app, request(Method::DELETE, &uri, None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(&app, request(Method::GET, "/api/admin/categories?limit=5", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn bulk_delete_only() {
        let app = app_router(test_state().await);
        let mut ids = Vec::new();
        for name in ["DeFi", "Gaming"] {
            let (_, body) = send(
                &app,
                request(Method::POST, "/api/admin/categories", Some(json!({ "name": name }))),
            )
            .await;
            ids.push(body["data"]["id"].clone());
        }
        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/categories/bulk",
                Some(json!({ "action": "activate", "ids": ids })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/categories/bulk",
                Some(json!({ "action": "delete", "ids": ids })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Successfully deleted 2 categories");
    }
}
