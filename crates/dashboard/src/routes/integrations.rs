//! SES integration route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query},
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{error, info, instrument};
use xyno_client::resources::integrations::{self, IntegrationCreate};
use xyno_core::{IntegrationId, SesIntegration};

use crate::filters;
use crate::middleware::RequireAuth;
use crate::page::{Flash, MessageQuery, PageContext, failure_message, redirect_with};

const LIST_PATH: &str = "/integrations";

/// Regions offered in the "Add SES Integration" dialog.
pub const SES_REGIONS: [&str; 8] = [
    "us-east-1",
    "us-east-2",
    "us-west-2",
    "eu-west-1",
    "eu-west-2",
    "eu-central-1",
    "ap-southeast-1",
    "ap-southeast-2",
];

/// Integration list page.
#[derive(Template, WebTemplate)]
#[template(path = "integrations/index.html")]
pub struct IntegrationsTemplate {
    pub page: PageContext,
    pub integrations: Vec<SesIntegration>,
    pub regions: &'static [&'static str],
}

/// "Add SES Integration" form data.
#[derive(Deserialize)]
pub struct IntegrationForm {
    pub name: String,
    pub region: String,
    pub sender_email: String,
    pub aws_access_key: String,
    pub aws_secret_key: String,
}

impl IntegrationForm {
    fn into_create(self) -> Result<IntegrationCreate, &'static str> {
        let create = IntegrationCreate {
            name: self.name.trim().to_string(),
            region: self.region.trim().to_string(),
            sender_email: self.sender_email.trim().to_string(),
            aws_access_key: self.aws_access_key.trim().to_string(),
            aws_secret_key: SecretString::from(self.aws_secret_key.trim().to_string()),
        };
        if create.name.is_empty() || create.region.is_empty() || create.sender_email.is_empty() {
            return Err("Name, region and sender email are required");
        }
        if create.aws_access_key.is_empty() || self.aws_secret_key.trim().is_empty() {
            return Err("AWS credentials are required");
        }
        Ok(create)
    }
}

/// List integrations in the current environment.
#[instrument(skip_all)]
pub async fn index(RequireAuth(current): RequireAuth, Query(query): Query<MessageQuery>) -> Response {
    let mut page = PageContext::new(&current, LIST_PATH, query);

    let integrations = match integrations::list(&current.client).await {
        Ok(list) => list.into_results(),
        Err(e) => {
            error!(error = %e, "Failed to load integrations");
            page = page.with_error("Failed to load integrations");
            Vec::new()
        }
    };

    IntegrationsTemplate {
        page,
        integrations,
        regions: &SES_REGIONS,
    }
    .into_response()
}

/// Create an integration.
#[instrument(skip_all, fields(name = %form.name, region = %form.region))]
pub async fn create(RequireAuth(current): RequireAuth, Form(form): Form<IntegrationForm>) -> Response {
    let create = match form.into_create() {
        Ok(create) => create,
        Err(message) => return redirect_with(LIST_PATH, Flash::Error, message).into_response(),
    };

    match integrations::create(&current.client, &create).await {
        Ok(integration) => {
            info!(integration_id = %integration.id, "Integration created");
            redirect_with(LIST_PATH, Flash::Success, "Integration created").into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to create integration");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to create integration", &e))
                .into_response()
        }
    }
}

/// Delete an integration.
#[instrument(skip(current))]
pub async fn delete(RequireAuth(current): RequireAuth, Path(id): Path<IntegrationId>) -> Response {
    match integrations::delete(&current.client, id).await {
        Ok(()) => {
            info!(integration_id = %id, "Integration deleted");
            redirect_with(LIST_PATH, Flash::Success, "Integration deleted").into_response()
        }
        Err(e) => {
            error!(integration_id = %id, error = %e, "Failed to delete integration");
            redirect_with(LIST_PATH, Flash::Error, "Failed to delete integration").into_response()
        }
    }
}

/// Ask SES to send a verification email to the sender address.
#[instrument(skip(current))]
pub async fn verify(RequireAuth(current): RequireAuth, Path(id): Path<IntegrationId>) -> Response {
    match integrations::verify_sender(&current.client, id).await {
        Ok(detail) => redirect_with(LIST_PATH, Flash::Success, &detail.detail).into_response(),
        Err(e) => {
            error!(integration_id = %id, error = %e, "Failed to send verification");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to send verification", &e))
                .into_response()
        }
    }
}

/// Re-read the sender's verification status from SES.
#[instrument(skip(current))]
pub async fn check(RequireAuth(current): RequireAuth, Path(id): Path<IntegrationId>) -> Response {
    match integrations::check_verification(&current.client, id).await {
        Ok(status) if status.is_verified => {
            redirect_with(LIST_PATH, Flash::Success, "Sender is verified").into_response()
        }
        Ok(_) => redirect_with(LIST_PATH, Flash::Warning, "Sender is not yet verified").into_response(),
        Err(e) => {
            error!(integration_id = %id, error = %e, "Failed to check verification");
            redirect_with(LIST_PATH, Flash::Error, "Failed to check verification").into_response()
        }
    }
}

/// Check that the stored credentials can reach SES.
#[instrument(skip(current))]
pub async fn test(RequireAuth(current): RequireAuth, Path(id): Path<IntegrationId>) -> Response {
    match integrations::test_connection(&current.client, id).await {
        Ok(result) => {
            let (flash, fallback) = if result.success {
                (Flash::Success, "Connection successful!")
            } else {
                (Flash::Error, "Connection test failed")
            };
            let message = result.detail.unwrap_or_else(|| fallback.to_string());
            redirect_with(LIST_PATH, flash, &message).into_response()
        }
        Err(e) => {
            error!(integration_id = %id, error = %e, "Connection test failed");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Connection test failed", &e))
                .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn form() -> IntegrationForm {
        IntegrationForm {
            name: " Primary ".to_string(),
            region: "us-east-1".to_string(),
            sender_email: "noreply@example.com".to_string(),
            aws_access_key: "AKIAEXAMPLE".to_string(),
            aws_secret_key: " secret ".to_string(),
        }
    }

    #[test]
    fn test_integration_form_trims() {
        let create = form().into_create().unwrap();
        assert_eq!(create.name, "Primary");
        assert_eq!(create.aws_secret_key.expose_secret(), "secret");
    }

    #[test]
    fn test_integration_form_requires_credentials() {
        let mut missing = form();
        missing.aws_secret_key = "   ".to_string();
        assert_eq!(missing.into_create().unwrap_err(), "AWS credentials are required");
    }
}
