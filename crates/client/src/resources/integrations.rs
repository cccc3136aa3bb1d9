//! Amazon SES integrations.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::instrument;
use xyno_core::{
    ConnectionTest, Detail, IntegrationId, IntegrationPatch, Paginated, SesIntegration,
    VerificationStatus,
};

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

/// New integration. The AWS credentials are write-only on the API side.
#[derive(Debug)]
pub struct IntegrationCreate {
    pub name: String,
    pub region: String,
    pub sender_email: String,
    pub aws_access_key: String,
    pub aws_secret_key: SecretString,
}

impl IntegrationCreate {
    fn to_json(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "region": self.region,
            "sender_email": self.sender_email,
            "aws_access_key": self.aws_access_key,
            "aws_secret_key": self.aws_secret_key.expose_secret(),
        })
    }
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn list(client: &ApiClient) -> Result<Paginated<SesIntegration>, ApiError> {
    client.fetch(ApiRequest::get("integrations/")).await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn get(client: &ApiClient, id: IntegrationId) -> Result<SesIntegration, ApiError> {
    client
        .fetch(ApiRequest::get(format!("integrations/{id}/")))
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, input), fields(name = %input.name, region = %input.region))]
pub async fn create(
    client: &ApiClient,
    input: &IntegrationCreate,
) -> Result<SesIntegration, ApiError> {
    client
        .fetch(ApiRequest::post("integrations/").json(&input.to_json())?)
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, patch))]
pub async fn update(
    client: &ApiClient,
    id: IntegrationId,
    patch: &IntegrationPatch,
) -> Result<SesIntegration, ApiError> {
    client
        .fetch(ApiRequest::patch(format!("integrations/{id}/")).json(patch)?)
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn delete(client: &ApiClient, id: IntegrationId) -> Result<(), ApiError> {
    client
        .send(ApiRequest::delete(format!("integrations/{id}/")))
        .await
}

/// Ask SES to send a verification email to the sender address.
///
/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn verify_sender(client: &ApiClient, id: IntegrationId) -> Result<Detail, ApiError> {
    client
        .fetch(ApiRequest::post(format!("integrations/{id}/verify_sender/")))
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn check_verification(
    client: &ApiClient,
    id: IntegrationId,
) -> Result<VerificationStatus, ApiError> {
    client
        .fetch(ApiRequest::get(format!("integrations/{id}/check_verification/")))
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn test_connection(client: &ApiClient, id: IntegrationId) -> Result<ConnectionTest, ApiError> {
    client
        .fetch(ApiRequest::post(format!("integrations/{id}/test_connection/")))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_payload_includes_secret_but_debug_hides_it() {
        let input = IntegrationCreate {
            name: "Primary".to_string(),
            region: "us-east-1".to_string(),
            sender_email: "noreply@example.com".to_string(),
            aws_access_key: "AKIAEXAMPLE".to_string(),
            aws_secret_key: SecretString::from("super-secret-key".to_string()),
        };

        assert_eq!(input.to_json()["aws_secret_key"], "super-secret-key");
        assert!(!format!("{input:?}").contains("super-secret-key"));
    }
}
