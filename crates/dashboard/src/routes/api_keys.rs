//! API key route handlers.
//!
//! A raw key is only returned by the create call, so the page that follows
//! creation is rendered directly instead of redirecting.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, info, instrument};
use xyno_client::resources::api_keys;
use xyno_core::{ApiKey, ApiKeyId};

use crate::filters;
use crate::middleware::{CurrentUser, RequireAuth};
use crate::page::{Flash, MessageQuery, PageContext, failure_message, redirect_with};

const LIST_PATH: &str = "/api-keys";

/// API key list page.
#[derive(Template, WebTemplate)]
#[template(path = "api_keys/index.html")]
pub struct ApiKeysTemplate {
    pub page: PageContext,
    pub keys: Vec<ApiKey>,
    /// Name and raw value of a key created by this request.
    pub created: Option<(String, String)>,
}

/// "Create API Key" form data.
#[derive(Debug, Deserialize)]
pub struct CreateKeyForm {
    pub name: String,
}

/// Enable/disable form data: the state to switch to.
#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub active: bool,
}

/// List API keys in the current environment.
#[instrument(skip_all)]
pub async fn index(RequireAuth(current): RequireAuth, Query(query): Query<MessageQuery>) -> Response {
    let page = PageContext::new(&current, LIST_PATH, query);
    render(&current, page, None).await
}

async fn render(current: &CurrentUser, mut page: PageContext, created: Option<(String, String)>) -> Response {
    let keys = match api_keys::list(&current.client).await {
        Ok(list) => list.into_results(),
        Err(e) => {
            error!(error = %e, "Failed to load API keys");
            page = page.with_error("Failed to load API keys");
            Vec::new()
        }
    };

    ApiKeysTemplate {
        page,
        keys,
        created,
    }
    .into_response()
}

/// Create a key and show its raw value once.
#[instrument(skip_all, fields(name = %form.name))]
pub async fn create(RequireAuth(current): RequireAuth, Form(form): Form<CreateKeyForm>) -> Response {
    let name = form.name.trim();
    if name.is_empty() {
        return redirect_with(LIST_PATH, Flash::Error, "Key name is required").into_response();
    }

    match api_keys::create(&current.client, name).await {
        Ok(key) => {
            info!(key_id = %key.id, prefix = %key.prefix, "API key created");
            let Some(raw_key) = key.raw_key else {
                return redirect_with(LIST_PATH, Flash::Warning, "API key created, but no key was returned")
                    .into_response();
            };
            let page = PageContext::new(&current, LIST_PATH, MessageQuery::default());
            render(&current, page, Some((key.name, raw_key))).await
        }
        Err(e) => {
            error!(error = %e, "Failed to create API key");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to create API key", &e))
                .into_response()
        }
    }
}

/// Activate or deactivate a key.
#[instrument(skip(current))]
pub async fn toggle(
    RequireAuth(current): RequireAuth,
    Path(id): Path<ApiKeyId>,
    Form(form): Form<ToggleForm>,
) -> Response {
    match api_keys::set_active(&current.client, id, form.active).await {
        Ok(key) => {
            info!(key_id = %id, is_active = key.is_active, "API key updated");
            let message = if key.is_active {
                "API key activated"
            } else {
                "API key deactivated"
            };
            redirect_with(LIST_PATH, Flash::Success, message).into_response()
        }
        Err(e) => {
            error!(key_id = %id, error = %e, "Failed to update API key");
            redirect_with(LIST_PATH, Flash::Error, "Failed to update API key").into_response()
        }
    }
}

/// Delete a key. Applications using it stop working immediately.
#[instrument(skip(current))]
pub async fn delete(RequireAuth(current): RequireAuth, Path(id): Path<ApiKeyId>) -> Response {
    match api_keys::delete(&current.client, id).await {
        Ok(()) => {
            info!(key_id = %id, "API key deleted");
            redirect_with(LIST_PATH, Flash::Success, "API key deleted").into_response()
        }
        Err(e) => {
            error!(key_id = %id, error = %e, "Failed to delete API key");
            redirect_with(LIST_PATH, Flash::Error, "Failed to delete API key").into_response()
        }
    }
}
