//! Image upload endpoint used by the builder and the brand library.

use axum::{
    Json,
    extract::Multipart,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{info, instrument, warn};
use xyno_client::{Upload, resources::media};

use crate::middleware::RequireAuth;

/// Read the `file` field of a multipart form into an upload.
///
/// # Errors
///
/// Returns a user-facing message when the form is malformed or has no file.
pub async fn read_file(mut multipart: Multipart) -> Result<Upload, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| e.body_text())?;

        let upload = Upload::file(file_name, bytes.to_vec());
        // Browsers send application/octet-stream for unknown types; let the
        // file name decide then.
        return Ok(match content_type {
            Some(ct) if ct != "application/octet-stream" => upload.with_content_type(ct),
            _ => upload,
        });
    }
    Err("No file provided.".to_string())
}

/// Upload an image. Answers `201 {"url": ...}` or `400 {"error": ...}`.
#[instrument(skip_all)]
pub async fn upload(RequireAuth(current): RequireAuth, multipart: Multipart) -> Response {
    let file = match read_file(multipart).await {
        Ok(file) => file,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response();
        }
    };

    match media::upload(&current.client, file).await {
        Ok(url) => {
            info!(url = %url, "Image uploaded");
            (StatusCode::CREATED, Json(json!({ "url": url }))).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Image upload failed");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": e.user_message() }))).into_response()
        }
    }
}
