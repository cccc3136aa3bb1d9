//! Image uploads for the template builder.

use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest, Upload};

/// Content types the upload endpoint accepts.
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Deserialize)]
struct Uploaded {
    url: String,
}

/// Guess an image content type from a file name.
#[must_use]
pub fn content_type_for(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Check an upload against the endpoint's limits before sending it.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] for empty, oversized or non-image files.
pub fn validate(upload: &Upload) -> Result<(), ApiError> {
    if upload.bytes.is_empty() {
        return Err(ApiError::Validation("No file provided.".to_string()));
    }
    if upload.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::Validation(
            "File too large. Maximum size is 5 MB.".to_string(),
        ));
    }
    let content_type = upload
        .content_type
        .as_deref()
        .or_else(|| content_type_for(&upload.file_name));
    if !content_type.is_some_and(|ct| ALLOWED_CONTENT_TYPES.contains(&ct)) {
        return Err(ApiError::Validation(
            "Unsupported file type. Allowed: JPEG, PNG, GIF, WebP.".to_string(),
        ));
    }
    Ok(())
}

/// Upload an image and return its public URL.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] if the file is rejected locally, or the
/// API's rejection.
#[instrument(skip(client, upload), fields(file_name = %upload.file_name, size = upload.bytes.len()))]
pub async fn upload(client: &ApiClient, mut upload: Upload) -> Result<String, ApiError> {
    validate(&upload)?;
    if upload.content_type.is_none() {
        upload.content_type = content_type_for(&upload.file_name).map(str::to_string);
    }
    let uploaded: Uploaded = client
        .fetch(ApiRequest::post("media/upload/").upload(upload))
        .await?;
    Ok(uploaded.url)
}
