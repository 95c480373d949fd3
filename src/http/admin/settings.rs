use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::http::{ApiJson, Envelope, HttpError};
use crate::models::settings::AppSettings;
use crate::state::AppState;
use crate::store::activity::record_activity;
use crate::store::settings::{load_settings, save_settings};
use crate::validation::validate_settings;

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(show).post(save))
}

async fn show(State(state): State<AppState>) -> Result<Json<Envelope<AppSettings>>, HttpError> {
    let database = state.database()?;
    let settings = load_settings(database)
        .await
        .map_err(|err| HttpError::internal("Failed to fetch settings", err))?;
    Ok(Envelope::ok(settings))
}

async fn save(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Envelope<AppSettings>>, HttpError> {
    let changes: Vec<String> = body
        .as_object()
        .map(|fields| fields.keys().cloned().collect())
        .unwrap_or_default();
    let settings: AppSettings = serde_json::from_value(body).map_err(|err| {
        HttpError::bad_request("Invalid settings payload").with_detail("cause", err.to_string())
    })?;
    validate_settings(&settings).map_err(HttpError::validation)?;

    let database = state.database()?;
    let saved = save_settings(database, &settings)
        .await
        .map_err(|err| HttpError::store("Failed to save settings", err))?;
    record_activity(database, "settings_updated", json!({ "changes": changes })).await;
    Ok(Envelope::with_message(saved, "Settings saved successfully"))
}

#[cfg(test)]
mod tests {
    use crate::http::router as app_router;
    use crate::models::settings::AppSettings;
    use crate::store::activity::recent_activity;
    use crate::testing::{request, send, test_state};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn defaults_then_saved_values() {
        let state = test_state().await;
        let database = state.database().unwrap().clone();
        let app = app_router(state);

        let (status, body) = send(&app, request(Method::GET, "/api/admin/settings", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["siteName"], "AirdropHunter");

        let mut settings = serde_json::to_value(AppSettings::default()).unwrap();
        settings["siteName"] = json!("Hunter Weekly");
        settings["maintenanceMode"] = json!(true);
        let (status, body) =
            send(&app, request(Method::POST, "/api/admin/settings", Some(settings))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Settings saved successfully");

        let (_, body) = send(&app, request(Method::GET, "/api/admin/settings", None)).await;
        assert_eq!(body["data"]["siteName"], "Hunter Weekly");
        assert_eq!(body["data"]["maintenanceMode"], true);

        let activity = recent_activity(&database, 5).await.unwrap();
        assert_eq!(activity[0].action, "settings_updated");
    }

    #[tokio::test]
    async fn rejects_bad_email_and_colour() {
        let app = app_router(test_state().await);
        let mut settings = serde_json::to_value(AppSettings::default()).unwrap();
        settings["adminEmail"] = json!("not-an-email");
        settings["themeColor"] = json!("teal");
        let (status, body) =
            send(&app, request(Method::POST, "/api/admin/settings", Some(settings))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid admin email format");
        assert_eq!(body["details"]["themeColor"], "Invalid theme color format");

        let (status, body) = send(
            &app,
            request(Method::POST, "/api/admin/settings", Some(json!({ "siteName": "Only" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "siteDescription is required");
    }
}
