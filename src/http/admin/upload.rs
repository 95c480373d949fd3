use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::http::{Envelope, HttpError};
use crate::state::AppState;
use crate::store::activity::record_activity;

/// Room for the multipart framing around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_bytes + MULTIPART_OVERHEAD))
}

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    url: String,
    filename: String,
    path: String,
}

/// Raster types accepted for logos, with the extension they are stored under.
/// Scriptable formats such as SVG are refused since uploads are served from
/// the API's own origin.
const ALLOWED_IMAGE_TYPES: [(&str, &str); 5] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/avif", "avif"),
];

fn stored_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, extension)| *extension)
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Envelope<UploadedFile>>, HttpError> {
    let limit = state.uploads.max_bytes;
    let too_large = || {
        HttpError::bad_request(format!(
            "File size must be less than {}MB",
            limit.div_ceil(1024 * 1024)
        ))
    };

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| HttpError::bad_request("Malformed upload").with_detail("cause", err.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(HttpError::bad_request("Only image files are allowed"));
        }
        let Some(extension) = stored_extension(&content_type) else {
            return Err(HttpError::bad_request(format!(
                "Unsupported image type: {content_type}"
            )));
        };
        let bytes = field.bytes().await.map_err(|_| too_large())?;
        file = Some((content_type, extension, bytes));
        break;
    }
    let Some((content_type, extension, bytes)) = file else {
        return Err(HttpError::bad_request("No file uploaded"));
    };
    if bytes.len() > limit {
        return Err(too_large());
    }

    let filename = format!("airdrop-{}.{extension}", Utc::now().timestamp_millis());
    let relative = format!("logos/{filename}");
    let directory = state.uploads.directory.join("logos");
    tokio::fs::create_dir_all(&directory)
        .await
        .map_err(|err| HttpError::internal("Failed to upload file", err))?;
    tokio::fs::write(directory.join(&filename), &bytes)
        .await
        .map_err(|err| HttpError::internal("Failed to upload file", err))?;

    let url = format!(
        "{}/{relative}",
        state.uploads.public_path.trim_end_matches('/')
    );
    info!("Stored upload {relative} ({} bytes, {content_type})", bytes.len());
    if let Ok(database) = state.database() {
        record_activity(
            database,
            "file_uploaded",
            json!({ "path": relative, "bytes": bytes.len(), "contentType": content_type }),
        )
        .await;
    }
    Ok(Envelope::with_message(
        UploadedFile {
            url,
            filename,
            path: relative,
        },
        "File uploaded successfully",
    ))
}
