//! Request pipeline shared by every resource wrapper.
//!
//! Each request carries `X-Environment` and, when a token is stored, a bearer
//! token. A 401 on a regular request triggers at most one token refresh; all
//! requests that hit a 401 while that refresh is in flight wait on the same
//! future instead of starting their own.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::environment::EnvironmentState;
use crate::error::ApiError;
use crate::navigator::{LoginRedirect, NoopRedirect};
use crate::storage::{ACCESS_TOKEN_KEY, MemoryStorage, REFRESH_TOKEN_KEY, Storage};

/// Header naming the data partition a request targets.
pub const ENVIRONMENT_HEADER: &str = "X-Environment";

/// Token refresh endpoint, relative to the base URL.
const REFRESH_PATH: &str = "auth/token/refresh/";

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

/// Why a token refresh did not produce a new access token.
#[derive(Debug, Clone, Error)]
enum RefreshFailure {
    #[error("no refresh token stored")]
    MissingToken,
    #[error("refresh rejected with status {0}")]
    Rejected(u16),
    #[error("refresh request failed: {0}")]
    Transport(String),
    #[error("refresh response invalid: {0}")]
    Decode(String),
    #[error("could not store refreshed token: {0}")]
    Storage(String),
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

// =============================================================================
// Requests
// =============================================================================

/// A file sent as a multipart form field.
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// A file in the `file` form field.
    #[must_use]
    pub fn file(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: "file".to_string(),
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Clone)]
enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(Upload),
}

/// Description of one API call. Kept around so the call can be re-issued
/// after a token refresh.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Body,
    credential: bool,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            credential: false,
        }
    }

    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub(crate) fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub(crate) fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub(crate) fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub(crate) fn json<B: serde::Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Parse(format!("Failed to encode request body: {e}")))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    pub(crate) fn upload(mut self, upload: Upload) -> Self {
        self.body = Body::Multipart(upload);
        self
    }

    /// Mark as a credential exchange (login, register, password flows).
    ///
    /// These are sent without a bearer token and a 401 is returned to the
    /// caller as is instead of starting a refresh.
    pub(crate) const fn credential(mut self) -> Self {
        self.credential = true;
        self
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Shared handle to the Xyno API.
///
/// Cloning is cheap; clones share storage, environment and the in-flight
/// refresh.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: Url,
    storage: Arc<dyn Storage>,
    environment: EnvironmentState,
    navigator: Arc<dyn LoginRedirect>,
    refresh: Mutex<Option<SharedRefresh>>,
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    config: ClientConfig,
    storage: Option<Arc<dyn Storage>>,
    navigator: Option<Arc<dyn LoginRedirect>>,
    http: Option<reqwest::Client>,
}

impl ApiClientBuilder {
    /// Storage for tokens and the environment. Defaults to a fresh
    /// [`MemoryStorage`].
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Receiver of the "go to login" signal. Defaults to [`NoopRedirect`].
    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn LoginRedirect>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Reuse an existing connection pool instead of building one from the
    /// config's timeout and user agent.
    #[must_use]
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_url = self.config.parsed_base_url()?;
        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .timeout(self.config.timeout)
                .user_agent(self.config.user_agent.clone())
                .build()?,
        };
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let environment = EnvironmentState::load(Arc::clone(&storage));

        Ok(ApiClient {
            inner: Arc::new(ApiClientInner {
                http,
                base_url,
                storage,
                environment,
                navigator: self.navigator.unwrap_or_else(|| Arc::new(NoopRedirect)),
                refresh: Mutex::new(None),
            }),
        })
    }
}

impl ApiClient {
    #[must_use]
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            storage: None,
            navigator: None,
            http: None,
        }
    }

    /// API root every path is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The environment selection this client tags requests with.
    #[must_use]
    pub fn environment(&self) -> &EnvironmentState {
        &self.inner.environment
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    /// Whether an access token is stored.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.access_token().is_some()
    }

    fn access_token(&self) -> Option<String> {
        self.inner.storage.get(ACCESS_TOKEN_KEY)
    }

    /// Persist a token pair obtained from a credential exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if either token cannot be stored.
    pub fn store_tokens(&self, access: &SecretString, refresh: &SecretString) -> Result<(), ApiError> {
        self.inner
            .storage
            .set(ACCESS_TOKEN_KEY, access.expose_secret())?;
        self.inner
            .storage
            .set(REFRESH_TOKEN_KEY, refresh.expose_secret())?;
        Ok(())
    }

    /// Remove both tokens. Storage failures are logged, never returned.
    pub fn clear_tokens(&self) {
        clear_tokens(self.inner.storage.as_ref());
    }

    /// Send the "go to login" signal.
    pub fn redirect_to_login(&self) {
        self.inner.navigator.redirect_to_login();
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    // -------------------------------------------------------------------------
    // Typed helpers
    // -------------------------------------------------------------------------

    /// Execute a request and decode the JSON response.
    pub(crate) async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(&request).await?;
        Self::handle_response(response).await
    }

    /// Execute a request whose response body is irrelevant.
    pub(crate) async fn send(&self, request: ApiRequest) -> Result<(), ApiError> {
        let response = self.execute(&request).await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::parse_error(response).await)
    }

    // -------------------------------------------------------------------------
    // Pipeline
    // -------------------------------------------------------------------------

    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn execute(&self, request: &ApiRequest) -> Result<reqwest::Response, ApiError> {
        let sent_token = if request.credential {
            None
        } else {
            self.access_token()
        };

        let response = self.send_once(request, sent_token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED || request.credential {
            return Ok(response);
        }

        let stored = self.access_token();
        let token = if stored == sent_token {
            self.refreshed_access_token().await.map_err(|failure| {
                debug!(%failure, "Request abandoned after failed refresh");
                ApiError::SessionExpired
            })?
        } else if let Some(token) = stored {
            debug!("Access token changed while request was in flight, re-issuing");
            token
        } else {
            // A refresh already failed and cleared the session.
            return Err(ApiError::SessionExpired);
        };

        self.send_once(request, Some(&token)).await
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), self.url(&request.path)?)
            .header(
                ENVIRONMENT_HEADER,
                HeaderValue::from_static(self.inner.environment.current().as_str()),
            );

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(value.to_string()),
            Body::Multipart(upload) => builder.multipart(multipart_form(upload)?),
        };

        Ok(builder.send().await?)
    }

    /// Wait for the in-flight refresh, starting one if none is running.
    async fn refreshed_access_token(&self) -> Result<String, RefreshFailure> {
        let refresh = {
            let mut slot = self.inner.refresh.lock().await;
            if let Some(in_flight) = slot.as_ref() {
                debug!("Joining in-flight token refresh");
                in_flight.clone()
            } else {
                let started = refresh_tokens(
                    self.inner.http.clone(),
                    self.inner.base_url.clone(),
                    Arc::clone(&self.inner.storage),
                    Arc::clone(&self.inner.navigator),
                )
                .boxed()
                .shared();
                *slot = Some(started.clone());
                started
            }
        };

        let result = refresh.clone().await;

        let mut slot = self.inner.refresh.lock().await;
        if slot.as_ref().is_some_and(|in_flight| in_flight.ptr_eq(&refresh)) {
            *slot = None;
        }

        result
    }

    /// Decode a success response or convert a failure into an error.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")))
    }

    async fn parse_error(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        ApiError::Status { status, body }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("environment", &self.inner.environment.current())
            .finish_non_exhaustive()
    }
}

fn multipart_form(upload: &Upload) -> Result<reqwest::multipart::Form, ApiError> {
    let mut part =
        reqwest::multipart::Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
    if let Some(content_type) = &upload.content_type {
        part = part
            .mime_str(content_type)
            .map_err(|e| ApiError::Validation(format!("Invalid content type: {e}")))?;
    }
    Ok(reqwest::multipart::Form::new().part(upload.field.clone(), part))
}

fn clear_tokens(storage: &dyn Storage) {
    for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
        if let Err(e) = storage.remove(key) {
            warn!(key, error = %e, "Failed to clear stored token");
        }
    }
}

/// Exchange the stored refresh token for a new access token.
///
/// On failure both tokens are cleared and the login redirect fires. This runs
/// inside the shared future, so both happen once per failed refresh no matter
/// how many requests were waiting on it.
async fn refresh_tokens(
    http: reqwest::Client,
    base_url: Url,
    storage: Arc<dyn Storage>,
    navigator: Arc<dyn LoginRedirect>,
) -> Result<String, RefreshFailure> {
    let outcome = request_refresh(&http, &base_url, storage.as_ref()).await;
    match outcome {
        Ok(access) => {
            debug!("Access token refreshed");
            Ok(access)
        }
        Err(failure) => {
            warn!(%failure, "Token refresh failed, ending session");
            clear_tokens(storage.as_ref());
            navigator.redirect_to_login();
            Err(failure)
        }
    }
}

async fn request_refresh(
    http: &reqwest::Client,
    base_url: &Url,
    storage: &dyn Storage,
) -> Result<String, RefreshFailure> {
    let refresh = storage
        .get(REFRESH_TOKEN_KEY)
        .map(SecretString::from)
        .ok_or(RefreshFailure::MissingToken)?;

    let url = base_url
        .join(REFRESH_PATH)
        .map_err(|e| RefreshFailure::Transport(e.to_string()))?;

    let response = http
        .post(url)
        .json(&serde_json::json!({ "refresh": refresh.expose_secret() }))
        .send()
        .await
        .map_err(|e| RefreshFailure::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RefreshFailure::Rejected(status.as_u16()));
    }

    let tokens: RefreshResponse = response
        .json()
        .await
        .map_err(|e| RefreshFailure::Decode(e.to_string()))?;

    storage
        .set(ACCESS_TOKEN_KEY, &tokens.access)
        .map_err(|e| RefreshFailure::Storage(e.to_string()))?;
    if let Some(rotated) = &tokens.refresh {
        storage
            .set(REFRESH_TOKEN_KEY, rotated)
            .map_err(|e| RefreshFailure::Storage(e.to_string()))?;
    }

    Ok(tokens.access)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use xyno_core::Environment;

    use super::*;
    use crate::navigator::RecordingRedirect;

    #[derive(Clone, Default)]
    struct Backend {
        refreshes: Arc<AtomicUsize>,
        refresh_ok: bool,
    }

    async fn echo(headers: HeaderMap) -> axum::response::Response {
        use axum::response::IntoResponse;

        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if auth == "Bearer expired" {
            return (StatusCode::UNAUTHORIZED, "{\"detail\":\"expired\"}").into_response();
        }
        Json(serde_json::json!({
            "authorization": auth,
            "environment": headers.get("x-environment").and_then(|v| v.to_str().ok()),
        }))
        .into_response()
    }

    async fn refresh(State(backend): State<Backend>) -> axum::response::Response {
        use axum::response::IntoResponse;

        backend.refreshes.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if backend.refresh_ok {
            Json(serde_json::json!({"access": "fresh", "refresh": "r2"})).into_response()
        } else {
            StatusCode::UNAUTHORIZED.into_response()
        }
    }

    async fn login() -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    async fn spawn(backend: Backend) -> String {
        let app = Router::new()
            .route("/api/echo/", get(echo))
            .route("/api/auth/login/", post(login))
            .route("/api/auth/token/refresh/", post(refresh))
            .with_state(backend);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn client(base: &str, storage: Arc<MemoryStorage>, navigator: Arc<RecordingRedirect>) -> ApiClient {
        ApiClient::builder(ClientConfig::with_base_url(base))
            .storage(storage)
            .navigator(navigator)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_headers_follow_token_and_environment() {
        let base = spawn(Backend::default()).await;
        let storage = Arc::new(MemoryStorage::new());
        let api = client(&base, storage.clone(), Arc::new(RecordingRedirect::new()));

        let body: serde_json::Value = api.fetch(ApiRequest::get("echo/")).await.unwrap();
        assert_eq!(body["authorization"], "");
        assert_eq!(body["environment"], "sandbox");

        storage.set(ACCESS_TOKEN_KEY, "a1").unwrap();
        api.environment().set(Environment::Production).unwrap();

        let body: serde_json::Value = api.fetch(ApiRequest::get("echo/")).await.unwrap();
        assert_eq!(body["authorization"], "Bearer a1");
        assert_eq!(body["environment"], "production");
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let backend = Backend {
            refresh_ok: true,
            ..Backend::default()
        };
        let refreshes = backend.refreshes.clone();
        let base = spawn(backend).await;

        let storage = Arc::new(MemoryStorage::new());
        storage.set(ACCESS_TOKEN_KEY, "expired").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "r1").unwrap();
        let navigator = Arc::new(RecordingRedirect::new());
        let api = client(&base, storage.clone(), navigator.clone());

        let calls = (0..5).map(|_| api.fetch::<serde_json::Value>(ApiRequest::get("echo/")));
        let results = futures::future::join_all(calls).await;

        for result in results {
            assert_eq!(result.unwrap()["authorization"], "Bearer fresh");
        }
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("fresh"));
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).as_deref(), Some("r2"));
        assert!(!navigator.was_redirected());
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_tokens_and_redirects_once() {
        let backend = Backend::default();
        let refreshes = backend.refreshes.clone();
        let base = spawn(backend).await;

        let storage = Arc::new(MemoryStorage::new());
        storage.set(ACCESS_TOKEN_KEY, "expired").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "r1").unwrap();
        let navigator = Arc::new(RecordingRedirect::new());
        let api = client(&base, storage.clone(), navigator.clone());

        let calls = (0..3).map(|_| api.fetch::<serde_json::Value>(ApiRequest::get("echo/")));
        let results = futures::future::join_all(calls).await;

        for result in results {
            assert!(matches!(result, Err(ApiError::SessionExpired)));
        }
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(navigator.count(), 1);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(storage.get(REFRESH_TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn test_credential_401_skips_refresh() {
        let backend = Backend {
            refresh_ok: true,
            ..Backend::default()
        };
        let refreshes = backend.refreshes.clone();
        let base = spawn(backend).await;

        let storage = Arc::new(MemoryStorage::new());
        storage.set(REFRESH_TOKEN_KEY, "r1").unwrap();
        let navigator = Arc::new(RecordingRedirect::new());
        let api = client(&base, storage.clone(), navigator.clone());

        let request = ApiRequest::post("auth/login/")
            .json(&serde_json::json!({"username": "u", "password": "wrong"}))
            .unwrap()
            .credential();
        let err = api.send(request).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        assert!(!navigator.was_redirected());
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).as_deref(), Some("r1"));
    }
}
