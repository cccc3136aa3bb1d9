//! Events: trigger slugs bound to a template and an integration.

use tracing::instrument;
use xyno_core::{Event, EventId, EventInput, EventPatch, Paginated, PromotedEvent, TestSendRequest, TestSendResult};

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn list(client: &ApiClient) -> Result<Paginated<Event>, ApiError> {
    client.fetch(ApiRequest::get("events/")).await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn get(client: &ApiClient, id: EventId) -> Result<Event, ApiError> {
    client.fetch(ApiRequest::get(format!("events/{id}/"))).await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, input), fields(name = %input.name))]
pub async fn create(client: &ApiClient, input: &EventInput) -> Result<Event, ApiError> {
    client.fetch(ApiRequest::post("events/").json(input)?).await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, patch))]
pub async fn update(client: &ApiClient, id: EventId, patch: &EventPatch) -> Result<Event, ApiError> {
    client
        .fetch(ApiRequest::patch(format!("events/{id}/")).json(patch)?)
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn delete(client: &ApiClient, id: EventId) -> Result<(), ApiError> {
    client.send(ApiRequest::delete(format!("events/{id}/"))).await
}

/// Queue a test send of the event to `request.recipient`.
///
/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, request), fields(recipient = %request.recipient))]
pub async fn test(
    client: &ApiClient,
    id: EventId,
    request: &TestSendRequest,
) -> Result<TestSendResult, ApiError> {
    client
        .fetch(ApiRequest::post(format!("events/{id}/test/")).json(request)?)
        .await
}

/// Copy a sandbox event into production.
///
/// The result carries warnings when the bound template or integration has
/// no production counterpart yet.
///
/// # Errors
///
/// Returns an error if the request fails, including a 400 when the event is
/// not in sandbox.
#[instrument(skip(client))]
pub async fn promote(client: &ApiClient, id: EventId) -> Result<PromotedEvent, ApiError> {
    client
        .fetch(ApiRequest::post(format!("events/{id}/promote/")))
        .await
}
