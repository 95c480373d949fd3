use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::http::{ApiJson, Envelope, HttpError};
use crate::state::AppState;
use crate::store::activity::record_activity;
use crate::store::backup::{BackupDocument, TableRestore, create_backup, restore_backup};

pub fn router() -> Router<AppState> {
    Router::new().route("/backup", get(export).post(restore))
}

async fn export(State(state): State<AppState>) -> Result<Json<Envelope<BackupDocument>>, HttpError> {
    let database = state.database()?;
    let document = create_backup(database)
        .await
        .map_err(|err| HttpError::internal("Failed to create backup", err))?;
    record_activity(
        database,
        "backup_created",
        json!({ "recordCount": document.metadata.total_records }),
    )
    .await;
    Ok(Envelope::ok(document))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestoreRequest {
    backup_data: Option<Value>,
}

#[derive(Debug, Serialize)]
struct RestoreResponse {
    success: bool,
    message: &'static str,
    results: Vec<TableRestore>,
}

async fn restore(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RestoreRequest>,
) -> Result<Json<RestoreResponse>, HttpError> {
    let raw = request
        .backup_data
        .filter(|data| data.get("data").is_some())
        .ok_or_else(|| HttpError::bad_request("Invalid backup data"))?;
    let document: BackupDocument = serde_json::from_value(raw).map_err(|err| {
        HttpError::bad_request("Invalid backup format").with_detail("cause", err.to_string())
    })?;

    let database = state.database()?;
    let results = restore_backup(database, &document)
        .await
        .map_err(|err| HttpError::store("Failed to restore backup", err))?;
    state.cache.invalidate_airdrops().await;
    record_activity(
        database,
        "backup_restored",
        json!({ "backupTimestamp": document.timestamp, "results": results }),
    )
    .await;
    Ok(Json(RestoreResponse {
        success: true,
        message: "Backup restored successfully",
        results,
    }))
}

#[cfg(test)]
mod tests {
    use crate::http::router as app_router;
    use crate::store::activity::recent_activity;
    use crate::store::airdrops::{create_airdrop, delete_airdrop, find_airdrop};
    use crate::testing::{request, sample_draft, send, test_state};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn export_and_restore_round_trip() {
        let state = test_state().await;
        let database = state.database().unwrap().clone();
        let created = create_airdrop(&database, &sample_draft("Backed Up")).await.unwrap();
        let app = app_router(state);

        let (status, body) = send(&app, request(Method::GET, "/api/admin/backup", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["version"], "1.0");
        assert_eq!(body["data"]["metadata"]["totalRecords"], 3);

        delete_airdrop(&database, created.id()).await.unwrap();
        let (status, restored) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/backup",
                Some(json!({ "backupData": body["data"] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(restored["message"], "Backup restored successfully");
        assert_eq!(find_airdrop(&database, created.id()).await.unwrap().steps.len(), 2);

        let actions: Vec<String> = recent_activity(&database, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert!(actions.contains(&"backup_created".to_string()));
        assert!(actions.contains(&"backup_restored".to_string()));
    }

    #[tokio::test]
    async fn malformed_backups_are_rejected() {
        let app = app_router(test_state().await);
        let (status, body) =
            send(&app, request(Method::POST, "/api/admin/backup", Some(json!({})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid backup data");

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/admin/backup",
                Some(json!({ "backupData": { "data": {} } })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid backup format");
    }
}
