//! Credential exchange and the signed-in user's profile.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use xyno_core::{Email, ProfilePatch, User};

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

/// Access/refresh token pair returned by login.
pub struct TokenPair {
    pub access: SecretString,
    pub refresh: SecretString,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
struct RawTokenPair {
    access: String,
    refresh: String,
}

/// Sign-up form. Registering creates a new organization owned by the user.
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub password_confirm: SecretString,
    pub company_name: String,
}

impl Registration {
    /// Checks that need no round trip.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] if the username is blank, the email
    /// is malformed or the passwords differ.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.trim().is_empty() {
            return Err(ApiError::Validation("Username is required.".to_string()));
        }
        if let Err(e) = Email::parse(&self.email) {
            return Err(ApiError::Validation(format!("Enter a valid email: {e}.")));
        }
        if self.password.expose_secret() != self.password_confirm.expose_secret() {
            return Err(ApiError::Validation("Passwords do not match.".to_string()));
        }
        Ok(())
    }
}

/// Whether self-service sign-up is currently allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RegistrationStatus {
    pub registration_open: bool,
}

/// Exchange username and password for a token pair.
///
/// # Errors
///
/// Returns [`ApiError::Status`] with status 401 for wrong credentials.
#[instrument(skip(client, password))]
pub async fn login(
    client: &ApiClient,
    username: &str,
    password: &SecretString,
) -> Result<TokenPair, ApiError> {
    let request = ApiRequest::post("auth/login/")
        .json(&json!({ "username": username, "password": password.expose_secret() }))?
        .credential();
    let raw: RawTokenPair = client.fetch(request).await?;
    Ok(TokenPair {
        access: SecretString::from(raw.access),
        refresh: SecretString::from(raw.refresh),
    })
}

/// Create an account. Does not sign in.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] before any request if the form is
/// invalid, or the API's field errors otherwise.
#[instrument(skip(client, registration), fields(username = %registration.username))]
pub async fn register(client: &ApiClient, registration: &Registration) -> Result<(), ApiError> {
    registration.validate()?;
    let request = ApiRequest::post("auth/register/")
        .json(&json!({
            "username": registration.username,
            "email": registration.email,
            "password": registration.password.expose_secret(),
            "password_confirm": registration.password_confirm.expose_secret(),
            "company_name": registration.company_name,
        }))?
        .credential();
    client.send(request).await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn registration_status(client: &ApiClient) -> Result<RegistrationStatus, ApiError> {
    client
        .fetch(ApiRequest::get("auth/registration-status/").credential())
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn profile(client: &ApiClient) -> Result<User, ApiError> {
    client.fetch(ApiRequest::get("auth/profile/")).await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, patch))]
pub async fn update_profile(client: &ApiClient, patch: &ProfilePatch) -> Result<User, ApiError> {
    client
        .fetch(ApiRequest::patch("auth/profile/").json(patch)?)
        .await
}

/// Ask for a password reset link. The API answers the same way whether or
/// not the address is known.
///
/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn forgot_password(client: &ApiClient, email: &str) -> Result<(), ApiError> {
    let request = ApiRequest::post("auth/forgot-password/")
        .json(&json!({ "email": email }))?
        .credential();
    client.send(request).await
}

/// Choose a password with an invitation token.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] if the passwords differ, or the API's
/// rejection (expired token, weak password).
#[instrument(skip_all)]
pub async fn set_password(
    client: &ApiClient,
    token: &str,
    password: &SecretString,
    password_confirm: &SecretString,
) -> Result<(), ApiError> {
    password_with_token(client, "auth/set-password/", token, password, password_confirm).await
}

/// Choose a new password with a reset token.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] if the passwords differ, or the API's
/// rejection (expired token, weak password).
#[instrument(skip_all)]
pub async fn reset_password(
    client: &ApiClient,
    token: &str,
    password: &SecretString,
    password_confirm: &SecretString,
) -> Result<(), ApiError> {
    password_with_token(client, "auth/reset-password/", token, password, password_confirm).await
}

async fn password_with_token(
    client: &ApiClient,
    path: &str,
    token: &str,
    password: &SecretString,
    password_confirm: &SecretString,
) -> Result<(), ApiError> {
    if password.expose_secret() != password_confirm.expose_secret() {
        return Err(ApiError::Validation("Passwords do not match.".to_string()));
    }
    let request = ApiRequest::post(path)
        .json(&json!({
            "token": token,
            "password": password.expose_secret(),
            "password_confirm": password_confirm.expose_secret(),
        }))?
        .credential();
    client.send(request).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registration(password: &str, confirm: &str) -> Registration {
        Registration {
            username: "e2etest_1".to_string(),
            email: "e2etest_1@example.com".to_string(),
            password: SecretString::from(password.to_string()),
            password_confirm: SecretString::from(confirm.to_string()),
            company_name: String::new(),
        }
    }

    #[test]
    fn test_registration_password_mismatch() {
        let err = registration("testpass123!", "testpass123?").validate().unwrap_err();
        assert_eq!(err.user_message(), "Passwords do not match.");
    }

    #[test]
    fn test_registration_rejects_bad_email() {
        let mut form = registration("testpass123!", "testpass123!");
        form.email = "e2etest_1".to_string();
        let err = form.validate().unwrap_err();
        assert!(err.user_message().starts_with("Enter a valid email"));
    }

    #[test]
    fn test_registration_valid() {
        assert!(registration("testpass123!", "testpass123!").validate().is_ok());
    }

    #[test]
    fn test_token_pair_debug_redacts() {
        let pair = TokenPair {
            access: SecretString::from("a".repeat(10)),
            refresh: SecretString::from("r".repeat(10)),
        };
        let debug = format!("{pair:?}");
        assert!(!debug.contains("aaaa"));
        assert!(debug.contains("[REDACTED]"));
    }
}
