//! API keys used by client applications to trigger events.

use serde_json::json;
use tracing::instrument;
use xyno_core::{ApiKey, ApiKeyId, ApiKeyPatch, Paginated};

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn list(client: &ApiClient) -> Result<Paginated<ApiKey>, ApiError> {
    client.fetch(ApiRequest::get("auth/api-keys/")).await
}

/// Create a key in the current environment.
///
/// The returned key carries `raw_key`, the only time the full secret is
/// ever sent.
///
/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn create(client: &ApiClient, name: &str) -> Result<ApiKey, ApiError> {
    client
        .fetch(ApiRequest::post("auth/api-keys/").json(&json!({ "name": name }))?)
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, patch))]
pub async fn update(client: &ApiClient, id: ApiKeyId, patch: &ApiKeyPatch) -> Result<ApiKey, ApiError> {
    client
        .fetch(ApiRequest::patch(format!("auth/api-keys/{id}/")).json(patch)?)
        .await
}

/// Enable or disable a key.
///
/// # Errors
///
/// Returns an error if the request fails.
pub async fn set_active(client: &ApiClient, id: ApiKeyId, is_active: bool) -> Result<ApiKey, ApiError> {
    let patch = ApiKeyPatch {
        is_active: Some(is_active),
        ..ApiKeyPatch::default()
    };
    update(client, id, &patch).await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn delete(client: &ApiClient, id: ApiKeyId) -> Result<(), ApiError> {
    client
        .send(ApiRequest::delete(format!("auth/api-keys/{id}/")))
        .await
}
