//! The signed-in user.
//!
//! [`AuthSession`] starts out [`SessionState::Loading`] and settles on
//! authenticated or unauthenticated once [`AuthSession::initialize`] has
//! checked the stored token against the profile endpoint.

use std::sync::RwLock;

use secrecy::SecretString;
use tracing::{info, instrument, warn};
use xyno_core::{ProfilePatch, User};

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::resources::auth::{self, Registration};

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Stored credentials have not been checked yet.
    Loading,
    Authenticated(User),
    Unauthenticated,
}

impl SessionState {
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Loading | Self::Unauthenticated => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Session holder bound to one [`ApiClient`].
#[derive(Debug)]
pub struct AuthSession {
    client: ApiClient,
    state: RwLock<SessionState>,
}

impl AuthSession {
    /// A session whose stored credentials still need checking.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: RwLock::new(SessionState::Loading),
        }
    }

    /// A session for a user whose profile was already fetched.
    #[must_use]
    pub const fn restore(client: ApiClient, user: User) -> Self {
        Self {
            client,
            state: RwLock::new(SessionState::Authenticated(user)),
        }
    }

    #[must_use]
    pub const fn client(&self) -> &ApiClient {
        &self.client
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .map(|state| state.clone())
            .unwrap_or(SessionState::Unauthenticated)
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state().user().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Whether the signed-in user administers their organization.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state().user().is_some_and(User::is_admin)
    }

    fn set_state(&self, next: SessionState) {
        if let Ok(mut state) = self.state.write() {
            *state = next;
        }
    }

    /// Resolve the stored credentials.
    ///
    /// Without a stored access token this settles on unauthenticated without
    /// a network call. A token the profile endpoint rejects is cleared.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> SessionState {
        if !self.client.has_access_token() {
            self.set_state(SessionState::Unauthenticated);
            return SessionState::Unauthenticated;
        }

        let next = match auth::profile(&self.client).await {
            Ok(user) => SessionState::Authenticated(user),
            Err(e) => {
                warn!(error = %e, "Stored session rejected");
                self.client.clear_tokens();
                SessionState::Unauthenticated
            }
        };
        self.set_state(next.clone());
        next
    }

    /// Sign in: exchange credentials for tokens, then load the profile.
    ///
    /// # Errors
    ///
    /// Returns the API's rejection (401 for wrong credentials) or a storage
    /// error. The session state is unchanged on failure.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<User, ApiError> {
        let tokens = auth::login(&self.client, username, password).await?;
        self.client.store_tokens(&tokens.access, &tokens.refresh)?;

        let user = auth::profile(&self.client).await?;
        info!(user_id = %user.id, role = %user.role, "Signed in");
        self.set_state(SessionState::Authenticated(user.clone()));
        Ok(user)
    }

    /// Create an account and sign in with it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] without any request when the form is
    /// invalid, otherwise the API's rejection.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        registration.validate()?;
        auth::register(&self.client, registration).await?;
        self.login(&registration.username, &registration.password)
            .await
    }

    /// Sign out locally.
    ///
    /// Makes no request, so it works whether or not the API is reachable.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        self.client.clear_tokens();
        self.set_state(SessionState::Unauthenticated);
        self.client.redirect_to_login();
        info!("Signed out");
    }

    /// Update the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, patch))]
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<User, ApiError> {
        let user = auth::update_profile(&self.client, patch).await?;
        self.set_state(SessionState::Authenticated(user.clone()));
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use xyno_core::UserRole;

    use super::*;
    use crate::config::ClientConfig;
    use crate::navigator::RecordingRedirect;
    use crate::storage::{ACCESS_TOKEN_KEY, MemoryStorage, REFRESH_TOKEN_KEY, Storage};

    fn profile(role: &str) -> serde_json::Value {
        serde_json::json!({
            "id": 7,
            "username": "e2etest_1",
            "email": "e2etest_1@example.com",
            "role": role,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    async fn login(Json(body): Json<serde_json::Value>) -> axum::response::Response {
        if body["password"] == "testpass123!" {
            Json(serde_json::json!({"access": "a1", "refresh": "r1"})).into_response()
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"detail": "No active account found with the given credentials"})),
            )
                .into_response()
        }
    }

    async fn profile_handler(State(calls): State<Arc<AtomicUsize>>, headers: HeaderMap) -> axum::response::Response {
        calls.fetch_add(1, Ordering::SeqCst);
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some("Bearer a1") => Json(profile("admin")).into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    async fn spawn() -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/api/auth/login/", post(login))
            .route("/api/auth/profile/", get(profile_handler))
            .route(
                "/api/auth/token/refresh/",
                post(|| async { StatusCode::UNAUTHORIZED }),
            )
            .with_state(calls.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/api"), calls)
    }

    fn session(base: &str) -> (AuthSession, Arc<MemoryStorage>, Arc<RecordingRedirect>) {
        let storage = Arc::new(MemoryStorage::new());
        let navigator = Arc::new(RecordingRedirect::new());
        let client = ApiClient::builder(ClientConfig::with_base_url(base))
            .storage(storage.clone())
            .navigator(navigator.clone())
            .build()
            .unwrap();
        (AuthSession::new(client), storage, navigator)
    }

    #[tokio::test]
    async fn test_initialize_without_token_skips_network() {
        let (base, calls) = spawn().await;
        let (session, _, _) = session(&base);

        assert!(session.state().is_loading());
        assert_eq!(session.initialize().await, SessionState::Unauthenticated);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_initialize_with_rejected_token_clears_it() {
        let (base, _) = spawn().await;
        let (session, storage, _) = session(&base);
        storage.set(ACCESS_TOKEN_KEY, "stale").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "stale").unwrap();

        assert_eq!(session.initialize().await, SessionState::Unauthenticated);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(storage.get(REFRESH_TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn test_login_stores_tokens_and_loads_profile() {
        let (base, calls) = spawn().await;
        let (session, storage, _) = session(&base);

        let user = session
            .login("e2etest_1", &SecretString::from("testpass123!".to_string()))
            .await
            .unwrap();

        assert_eq!(user.role, UserRole::Admin);
        assert!(session.is_admin());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("a1"));
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_wrong_password_is_not_a_session_expiry() {
        let (base, _) = spawn().await;
        let (session, _, navigator) = session(&base);

        let err = session
            .login("e2etest_1", &SecretString::from("nope".to_string()))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(
            err.user_message(),
            "No active account found with the given credentials"
        );
        assert!(!navigator.was_redirected());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_mismatch_fails_before_network() {
        // Nothing listens here; a request would fail with a transport error.
        let (session, _, _) = session("http://127.0.0.1:9/api");

        let err = session
            .register(&Registration {
                username: "e2etest_1".to_string(),
                email: "e2etest_1@example.com".to_string(),
                password: SecretString::from("testpass123!".to_string()),
                password_confirm: SecretString::from("different".to_string()),
                company_name: String::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_logout_clears_tokens_without_network() {
        let (session, storage, navigator) = session("http://127.0.0.1:9/api");
        storage.set(ACCESS_TOKEN_KEY, "a1").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "r1").unwrap();

        session.logout();

        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(storage.get(REFRESH_TOKEN_KEY), None);
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(navigator.count(), 1);
    }
}
