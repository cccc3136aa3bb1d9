//! Email templates.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::instrument;
use xyno_core::{
    EmailTemplate, Paginated, Placeholder, TemplateId, TemplateInput, TemplatePatch,
    TemplatePreview, UploadHtml,
};

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

/// List templates. List items omit `html_content` and `design_json`.
///
/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn list(client: &ApiClient) -> Result<Paginated<EmailTemplate>, ApiError> {
    client.fetch(ApiRequest::get("templates/")).await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn get(client: &ApiClient, id: TemplateId) -> Result<EmailTemplate, ApiError> {
    client.fetch(ApiRequest::get(format!("templates/{id}/"))).await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, input), fields(name = %input.name))]
pub async fn create(client: &ApiClient, input: &TemplateInput) -> Result<EmailTemplate, ApiError> {
    client
        .fetch(ApiRequest::post("templates/").json(input)?)
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, patch))]
pub async fn update(
    client: &ApiClient,
    id: TemplateId,
    patch: &TemplatePatch,
) -> Result<EmailTemplate, ApiError> {
    client
        .fetch(ApiRequest::patch(format!("templates/{id}/")).json(patch)?)
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn delete(client: &ApiClient, id: TemplateId) -> Result<(), ApiError> {
    client
        .send(ApiRequest::delete(format!("templates/{id}/")))
        .await
}

/// Render subject and HTML with `context` substituted for `{{key}}` tokens.
///
/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, context))]
pub async fn preview(
    client: &ApiClient,
    id: TemplateId,
    context: &BTreeMap<String, String>,
) -> Result<TemplatePreview, ApiError> {
    client
        .fetch(ApiRequest::post(format!("templates/{id}/preview/")).json(&json!({ "context": context }))?)
        .await
}

/// Create a template from raw HTML. Placeholders are detected server side.
///
/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, upload), fields(name = %upload.name))]
pub async fn upload_html(client: &ApiClient, upload: &UploadHtml) -> Result<EmailTemplate, ApiError> {
    client
        .fetch(ApiRequest::post("templates/upload-html/").json(upload)?)
        .await
}

/// Update the default values of placeholders the template already has.
/// Unknown names are ignored by the API.
///
/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, placeholders), fields(count = placeholders.len()))]
pub async fn update_placeholders(
    client: &ApiClient,
    id: TemplateId,
    placeholders: &[Placeholder],
) -> Result<EmailTemplate, ApiError> {
    client
        .fetch(
            ApiRequest::post(format!("templates/{id}/update-placeholders/"))
                .json(&json!({ "placeholders": placeholders }))?,
        )
        .await
}

/// Copy a sandbox template into production, replacing a production
/// template with the same name.
///
/// # Errors
///
/// Returns an error if the request fails, including a 400 when the template
/// is not in sandbox.
#[instrument(skip(client))]
pub async fn promote(client: &ApiClient, id: TemplateId) -> Result<EmailTemplate, ApiError> {
    client
        .fetch(ApiRequest::post(format!("templates/{id}/promote/")))
        .await
}
