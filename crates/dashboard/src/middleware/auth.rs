//! Authentication extractors for the dashboard.
//!
//! A visitor counts as signed in when their stored tokens resolve to a
//! profile. The profile is fetched once through [`AuthSession::initialize`]
//! and cached in the tower-session; the cache is dropped on sign-out and
//! whenever the API client gives up on the session.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::error;
use xyno_client::{ApiClient, AuthSession, SessionState};
use xyno_core::{Environment, User};

use super::client::{ClientContext, session_keys};
use crate::error::set_sentry_user;

/// The signed-in user together with the request's API client.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub client: ApiClient,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    /// Environment the user is currently working in.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.client.environment().current()
    }
}

/// Extractor that requires a signed-in user.
///
/// Visitors without a valid session are redirected to the login page.
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a signed-in organization admin.
///
/// Developers are sent back to the dashboard with an error banner.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor for pages that behave differently for signed-in visitors.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Error returned when a page needs a session the visitor does not have.
pub enum AuthRejection {
    /// Not signed in.
    RedirectToLogin,
    /// Signed in, but not an admin.
    NotAdmin,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::NotAdmin => Redirect::to(&format!(
                "/dashboard?error={}",
                urlencoding::encode("Only admins can manage users.")
            ))
            .into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve(parts)
            .await
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let current = resolve(parts)
            .await
            .ok_or(AuthRejection::RedirectToLogin)?;
        if !current.is_admin() {
            return Err(AuthRejection::NotAdmin);
        }
        Ok(Self(current))
    }
}

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve(parts).await))
    }
}

async fn resolve(parts: &Parts) -> Option<CurrentUser> {
    let client = parts.extensions.get::<ClientContext>()?.client().clone();
    let session = parts.extensions.get::<Session>()?.clone();
    current_user(&session, client).await
}

/// Resolve the signed-in user for `client`.
///
/// Without a stored access token this returns `None` without touching the
/// network.
pub async fn current_user(session: &Session, client: ApiClient) -> Option<CurrentUser> {
    if !client.has_access_token() {
        return None;
    }

    if let Some(user) = session
        .get::<User>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    {
        return Some(CurrentUser { user, client });
    }

    let auth = AuthSession::new(client);
    match auth.initialize().await {
        SessionState::Authenticated(user) => {
            remember_user(session, &user).await;
            Some(CurrentUser {
                user,
                client: auth.client().clone(),
            })
        }
        SessionState::Loading | SessionState::Unauthenticated => None,
    }
}

/// Cache the signed-in user's profile in the session.
pub async fn remember_user(session: &Session, user: &User) {
    set_sentry_user(user.id.as_i64(), &user.username);
    if let Err(e) = session.insert(session_keys::CURRENT_USER, user).await {
        error!(error = %e, "Failed to cache user in session");
    }
}

/// Drop the cached profile.
pub async fn forget_user(session: &Session) {
    if let Err(e) = session.remove::<User>(session_keys::CURRENT_USER).await {
        error!(error = %e, "Failed to drop cached user from session");
    }
}
