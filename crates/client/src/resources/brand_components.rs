//! Reusable brand components for the template builder.

use tracing::instrument;
use xyno_core::{
    BrandCategory, BrandComponent, BrandComponentId, BrandComponentInput, BrandComponentPatch,
    Paginated,
};

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

/// List components, optionally restricted to one category.
///
/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn list(
    client: &ApiClient,
    category: Option<BrandCategory>,
) -> Result<Paginated<BrandComponent>, ApiError> {
    let query = category
        .map(|c| vec![("category".to_string(), c.as_str().to_string())])
        .unwrap_or_default();
    client
        .fetch(ApiRequest::get("brand-components/").query(query))
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn get(client: &ApiClient, id: BrandComponentId) -> Result<BrandComponent, ApiError> {
    client
        .fetch(ApiRequest::get(format!("brand-components/{id}/")))
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, input), fields(name = %input.name, category = %input.category.as_str()))]
pub async fn create(
    client: &ApiClient,
    input: &BrandComponentInput,
) -> Result<BrandComponent, ApiError> {
    client
        .fetch(ApiRequest::post("brand-components/").json(input)?)
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, patch))]
pub async fn update(
    client: &ApiClient,
    id: BrandComponentId,
    patch: &BrandComponentPatch,
) -> Result<BrandComponent, ApiError> {
    client
        .fetch(ApiRequest::patch(format!("brand-components/{id}/")).json(patch)?)
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn delete(client: &ApiClient, id: BrandComponentId) -> Result<(), ApiError> {
    client
        .send(ApiRequest::delete(format!("brand-components/{id}/")))
        .await
}
