//! Authentication route handlers.
//!
//! Handles login, registration, logout and the token-based password flows
//! (invitation and reset) against the Xyno API.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::Query,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};
use xyno_client::{ApiClient, ApiError, AuthSession, Registration, resources::auth};

use crate::filters;
use crate::middleware::{ClientContext, OptionalAuth, forget_user, remember_user};
use crate::page::{Flash, MessageQuery, redirect_with};

const LOGIN_FAILED: &str = "Login failed. Check your credentials.";
const REGISTRATION_FAILED: &str = "Registration failed.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub company_name: String,
    pub password: String,
    pub password_confirm: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Set or reset password form data.
#[derive(Deserialize)]
pub struct PasswordForm {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the token-based password pages.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub registration_open: bool,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub sent: bool,
}

/// Which token flow a password page serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordFlow {
    /// Invitation accepted by a new member.
    Invite,
    /// Password reset requested from the login page.
    Reset,
}

impl PasswordFlow {
    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            Self::Invite => "/set-password",
            Self::Reset => "/reset-password",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Invite => "Set your password to activate your account",
            Self::Reset => "Choose a new password",
        }
    }

    const fn invalid_link(self) -> &'static str {
        match self {
            Self::Invite => "Invalid invite link",
            Self::Reset => "Invalid reset link",
        }
    }

    const fn done(self) -> &'static str {
        match self {
            Self::Invite => "Password set successfully. Please log in.",
            Self::Reset => "Password reset successfully. Please log in.",
        }
    }
}

/// Set/reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/set_password.html")]
pub struct SetPasswordTemplate {
    pub flow: PasswordFlow,
    pub token: Option<String>,
    pub invalid_link: &'static str,
    pub error: Option<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in visitors go straight to the dashboard.
pub async fn login_page(
    OptionalAuth(current): OptionalAuth,
    ctx: ClientContext,
    Query(query): Query<MessageQuery>,
) -> Response {
    if current.is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    LoginTemplate {
        error: query.error,
        success: query.success,
        registration_open: registration_open(ctx.client()).await,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(ctx: ClientContext, session: Session, Form(form): Form<LoginForm>) -> Response {
    let auth = AuthSession::new(ctx.client().clone());

    let password = SecretString::from(form.password);
    match auth.login(form.username.trim(), &password).await {
        Ok(user) => {
            if let Err(e) = session.cycle_id().await {
                warn!(error = %e, "Failed to rotate session id");
            }
            remember_user(&session, &user).await;
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Login failed");
            let message = match &e {
                ApiError::Status { .. } => e.user_message(),
                _ => LOGIN_FAILED.to_string(),
            };
            redirect_with("/login", Flash::Error, &message).into_response()
        }
    }
}

/// Sign out locally and return to the login page.
///
/// Makes no API call, so it succeeds even when the API is unreachable.
pub async fn logout(ctx: ClientContext, session: Session) -> Response {
    AuthSession::new(ctx.client().clone()).logout();
    forget_user(&session).await;
    Redirect::to("/login").into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page, or bounce to login while sign-up is closed.
pub async fn register_page(
    OptionalAuth(current): OptionalAuth,
    ctx: ClientContext,
    Query(query): Query<MessageQuery>,
) -> Response {
    if current.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    if !registration_open(ctx.client()).await {
        return Redirect::to("/login").into_response();
    }

    RegisterTemplate { error: query.error }.into_response()
}

/// Handle registration form submission: create the account, then sign in.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn register(
    ctx: ClientContext,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let registration = Registration {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        password: SecretString::from(form.password),
        password_confirm: SecretString::from(form.password_confirm),
        company_name: form.company_name.trim().to_string(),
    };

    let auth = AuthSession::new(ctx.client().clone());
    match auth.register(&registration).await {
        Ok(user) => {
            if let Err(e) = session.cycle_id().await {
                warn!(error = %e, "Failed to rotate session id");
            }
            remember_user(&session, &user).await;
            tracing::info!(user_id = %user.id, "Account registered");
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Registration failed");
            redirect_with("/register", Flash::Error, &registration_error(&e)).into_response()
        }
    }
}

/// All of the API's field errors in one line.
fn registration_error(error: &ApiError) -> String {
    let messages = error.all_messages();
    if messages.is_empty() {
        REGISTRATION_FAILED.to_string()
    } else {
        messages.join(" ")
    }
}

async fn registration_open(client: &ApiClient) -> bool {
    match auth::registration_status(client).await {
        Ok(status) => status.registration_open,
        Err(e) => {
            warn!(error = %e, "Could not read registration status");
            false
        }
    }
}

// =============================================================================
// Password Routes
// =============================================================================

/// Display the forgot password form.
pub async fn forgot_password_page() -> impl IntoResponse {
    ForgotPasswordTemplate { sent: false }
}

/// Request a reset link. The confirmation is shown whatever the outcome, so
/// the page does not reveal which addresses have accounts.
#[instrument(skip_all)]
pub async fn forgot_password(
    ctx: ClientContext,
    Form(form): Form<ForgotPasswordForm>,
) -> impl IntoResponse {
    if let Err(e) = auth::forgot_password(ctx.client(), form.email.trim()).await {
        warn!(error = %e, "Forgot password request failed");
    }
    ForgotPasswordTemplate { sent: true }
}

/// Display the invitation password form.
pub async fn set_password_page(Query(query): Query<TokenQuery>) -> impl IntoResponse {
    password_page(PasswordFlow::Invite, query)
}

/// Display the reset password form.
pub async fn reset_password_page(Query(query): Query<TokenQuery>) -> impl IntoResponse {
    password_page(PasswordFlow::Reset, query)
}

fn password_page(flow: PasswordFlow, query: TokenQuery) -> SetPasswordTemplate {
    SetPasswordTemplate {
        flow,
        token: query.token.filter(|t| !t.trim().is_empty()),
        invalid_link: flow.invalid_link(),
        error: query.error,
    }
}

/// Accept an invitation.
pub async fn set_password(ctx: ClientContext, Form(form): Form<PasswordForm>) -> Response {
    submit_password(PasswordFlow::Invite, ctx.client(), form).await
}

/// Complete a password reset.
pub async fn reset_password(ctx: ClientContext, Form(form): Form<PasswordForm>) -> Response {
    submit_password(PasswordFlow::Reset, ctx.client(), form).await
}

#[instrument(skip(client, form))]
async fn submit_password(flow: PasswordFlow, client: &ApiClient, form: PasswordForm) -> Response {
    let password = SecretString::from(form.password);
    let confirm = SecretString::from(form.password_confirm);
    let result = match flow {
        PasswordFlow::Invite => auth::set_password(client, &form.token, &password, &confirm).await,
        PasswordFlow::Reset => auth::reset_password(client, &form.token, &password, &confirm).await,
    };

    match result {
        Ok(()) => redirect_with("/login", Flash::Success, flow.done()).into_response(),
        Err(e) => {
            warn!(error = %e, "Password update rejected");
            let mut message = e.all_messages().join(" ");
            if message.is_empty() {
                message = e.user_message();
            }
            let back = format!("{}?token={}", flow.action(), urlencoding::encode(&form.token));
            redirect_with(&back, Flash::Error, &message).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_error_joins_field_messages() {
        let err = ApiError::Status {
            status: 400,
            body: r#"{"email": ["Enter a valid email address."], "username": ["A user with that username already exists."]}"#.to_string(),
        };
        assert_eq!(
            registration_error(&err),
            "Enter a valid email address. A user with that username already exists."
        );
    }

    #[test]
    fn test_registration_error_fallback() {
        let err = ApiError::Status {
            status: 500,
            body: "Internal Server Error".to_string(),
        };
        assert_eq!(registration_error(&err), REGISTRATION_FAILED);
    }

    #[test]
    fn test_password_flow_copy() {
        assert_eq!(PasswordFlow::Invite.action(), "/set-password");
        assert_eq!(
            PasswordFlow::Invite.description(),
            "Set your password to activate your account"
        );
        assert_eq!(PasswordFlow::Reset.done(), "Password reset successfully. Please log in.");
    }
}
