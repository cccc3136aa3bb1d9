//! Integration test harness for Xyno.
//!
//! [`MockBackend`] is an in-process stand-in for the Xyno REST API, served on
//! an ephemeral port. It implements just enough of the API for end-to-end
//! tests of the client pipeline and the dashboard:
//!
//! - JWT-style login, registration, profile and token refresh
//! - per-environment partitions selected by the `X-Environment` header;
//!   developer accounts are always served sandbox data
//! - templates (upload, list, get, delete, promote) and events (create, list,
//!   get, promote with warnings)
//! - request recording and refresh counting for assertions
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p xyno-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use xyno_core::placeholder::detect_placeholders;
use xyno_core::{
    DashboardStats, EmailLog, EmailTemplate, Environment, Event, EventId, EventInput, Paginated,
    Placeholder, PromotedEvent, SesIntegration, TemplateId, UploadHtml, User, UserId, UserRole,
};

/// How long a refresh takes, so concurrent 401s overlap with it.
const REFRESH_DELAY: Duration = Duration::from_millis(50);

/// One request as seen by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub environment: Option<String>,
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
}

#[derive(Debug)]
struct MockState {
    next_id: i64,
    accounts: Vec<Account>,
    access_tokens: HashMap<String, UserId>,
    refresh_tokens: HashMap<String, UserId>,
    templates: Vec<EmailTemplate>,
    events: Vec<Event>,
    refreshes: usize,
    requests: Vec<RecordedRequest>,
    registration_open: bool,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_tokens(&mut self, user_id: UserId) -> (String, String) {
        let n = self.next_id();
        let access = format!("access-{n}");
        let refresh = format!("refresh-{n}");
        self.access_tokens.insert(access.clone(), user_id);
        self.refresh_tokens.insert(refresh.clone(), user_id);
        (access, refresh)
    }

    fn account(&self, id: UserId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.user.id == id)
    }
}

/// In-process fake of the Xyno API.
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
    addr: SocketAddr,
}

impl MockBackend {
    /// Start the backend on an ephemeral local port.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let backend = Self {
            state: Arc::new(Mutex::new(MockState {
                next_id: 0,
                accounts: Vec::new(),
                access_tokens: HashMap::new(),
                refresh_tokens: HashMap::new(),
                templates: Vec::new(),
                events: Vec::new(),
                refreshes: 0,
                requests: Vec::new(),
                registration_open: true,
            })),
            addr: listener.local_addr()?,
        };

        let app = router(backend.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(backend)
    }

    /// API root to configure clients with.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an account directly.
    pub fn add_user(&self, username: &str, password: &str, role: UserRole) -> User {
        let mut state = self.lock();
        let id = UserId::new(state.next_id());
        let now = Utc::now();
        let user = User {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            phone: String::new(),
            company_name: "Example Co".to_string(),
            role,
            created_at: now,
            updated_at: now,
        };
        state.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
        });
        user
    }

    /// Issue a fresh access/refresh pair for an existing account.
    #[must_use]
    pub fn issue_tokens(&self, username: &str) -> Option<(String, String)> {
        let mut state = self.lock();
        let id = state
            .accounts
            .iter()
            .find(|a| a.user.username == username)?
            .user
            .id;
        Some(state.issue_tokens(id))
    }

    /// Invalidate every access token, as if they had all expired.
    pub fn expire_access_tokens(&self) {
        self.lock().access_tokens.clear();
    }

    /// Invalidate every refresh token.
    pub fn revoke_refresh_tokens(&self) {
        self.lock().refresh_tokens.clear();
    }

    pub fn set_registration_open(&self, open: bool) {
        self.lock().registration_open = open;
    }

    /// Number of calls to the refresh endpoint so far.
    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.lock().refreshes
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Requests to `path` (relative to the API root, e.g. `templates/`).
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        let full = format!("/api/{path}");
        self.requests()
            .into_iter()
            .filter(|r| r.path == full)
            .collect()
    }

    /// Templates stored in one environment.
    #[must_use]
    pub fn templates_in(&self, environment: Environment) -> Vec<EmailTemplate> {
        self.lock()
            .templates
            .iter()
            .filter(|t| t.environment == Some(environment))
            .cloned()
            .collect()
    }

    /// Store a template directly.
    pub fn add_template(
        &self,
        environment: Environment,
        name: &str,
        subject: &str,
        html: &str,
    ) -> EmailTemplate {
        let mut state = self.lock();
        let template = new_template(&mut state, environment, name, subject, html);
        state.templates.push(template.clone());
        template
    }

    /// Resolve the bearer token and the environment the request is served
    /// from. Developers are pinned to sandbox whatever they ask for.
    fn authenticate(&self, headers: &HeaderMap) -> Result<(User, Environment), Response> {
        let state = self.lock();
        let user = bearer(headers)
            .and_then(|token| state.access_tokens.get(token))
            .and_then(|id| state.account(*id))
            .map(|account| account.user.clone())
            .ok_or_else(token_invalid)?;

        let requested = Environment::from_stored(
            headers
                .get("x-environment")
                .and_then(|v| v.to_str().ok()),
        );
        let environment = if user.is_admin() {
            requested
        } else {
            Environment::Sandbox
        };
        Ok((user, environment))
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn token_invalid() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "detail": "Given token not valid for any token type",
            "code": "token_not_valid"
        })),
    )
        .into_response()
}

fn bad_request(detail: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
}

fn slugify(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    slug.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn new_template(
    state: &mut MockState,
    environment: Environment,
    name: &str,
    subject: &str,
    html: &str,
) -> EmailTemplate {
    let now = Utc::now();
    let placeholders = detect_placeholders(&format!("{subject}\n{html}"))
        .into_iter()
        .map(Placeholder::new)
        .collect();
    EmailTemplate {
        id: TemplateId::new(state.next_id()),
        name: name.to_string(),
        environment: Some(environment),
        subject: subject.to_string(),
        html_content: html.to_string(),
        design_json: None,
        placeholders,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// Router
// =============================================================================

fn router(backend: MockBackend) -> Router {
    Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/auth/register/", post(register))
        .route("/api/auth/registration-status/", get(registration_status))
        .route("/api/auth/profile/", get(profile))
        .route("/api/auth/token/refresh/", post(refresh))
        .route("/api/logs/", get(logs))
        .route("/api/logs/dashboard-stats/", get(dashboard_stats))
        .route("/api/integrations/", get(integrations))
        .route("/api/templates/", get(list_templates))
        .route("/api/templates/upload-html/", post(upload_template))
        .route(
            "/api/templates/{id}/",
            get(get_template).delete(delete_template),
        )
        .route("/api/templates/{id}/promote/", post(promote_template))
        .route("/api/events/", get(list_events).post(create_event))
        .route("/api/events/{id}/", get(get_event))
        .route("/api/events/{id}/promote/", post(promote_event))
        .layer(from_fn_with_state(backend.clone(), record))
        .with_state(backend)
}

async fn record(State(backend): State<MockBackend>, request: Request, next: Next) -> Response {
    let recorded = {
        let headers = request.headers();
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        RecordedRequest {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            authorization: header("authorization"),
            environment: header("x-environment"),
        }
    };
    backend.lock().requests.push(recorded);
    next.run(request).await
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn login(State(backend): State<MockBackend>, Json(body): Json<Credentials>) -> Response {
    let mut state = backend.lock();
    let id = state
        .accounts
        .iter()
        .find(|a| a.user.username == body.username && a.password == body.password)
        .map(|a| a.user.id);

    match id {
        Some(id) => {
            let (access, refresh) = state.issue_tokens(id);
            Json(json!({ "access": access, "refresh": refresh })).into_response()
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "No active account found with the given credentials" })),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    #[serde(default)]
    email: String,
    password: String,
    password_confirm: String,
    #[serde(default)]
    company_name: String,
}

async fn register(State(backend): State<MockBackend>, Json(body): Json<RegisterBody>) -> Response {
    {
        let state = backend.lock();
        if !state.registration_open {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "detail": "Registration is closed." })),
            )
                .into_response();
        }
        if state.accounts.iter().any(|a| a.user.username == body.username) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "username": ["A user with that username already exists."] })),
            )
                .into_response();
        }
    }
    if body.password != body.password_confirm {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "password": ["Password fields didn't match."] })),
        )
            .into_response();
    }

    // Registering creates an organization owned by its first admin.
    let mut user = backend.add_user(&body.username, &body.password, UserRole::Admin);
    user.email = body.email;
    user.company_name = body.company_name;
    {
        let mut state = backend.lock();
        if let Some(account) = state.accounts.iter_mut().find(|a| a.user.id == user.id) {
            account.user = user.clone();
        }
    }
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn registration_status(State(backend): State<MockBackend>) -> Response {
    Json(json!({ "registration_open": backend.lock().registration_open })).into_response()
}

async fn profile(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    match backend.authenticate(&headers) {
        Ok((user, _)) => Json(user).into_response(),
        Err(rejection) => rejection,
    }
}

#[derive(Deserialize)]
struct RefreshBody {
    refresh: String,
}

async fn refresh(State(backend): State<MockBackend>, Json(body): Json<RefreshBody>) -> Response {
    backend.lock().refreshes += 1;
    tokio::time::sleep(REFRESH_DELAY).await;

    let mut state = backend.lock();
    let Some(&user_id) = state.refresh_tokens.get(&body.refresh) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" })),
        )
            .into_response();
    };
    let n = state.next_id();
    let access = format!("access-{n}");
    state.access_tokens.insert(access.clone(), user_id);
    Json(json!({ "access": access })).into_response()
}

// =============================================================================
// Read-only resources
// =============================================================================

async fn logs(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    match backend.authenticate(&headers) {
        Ok(_) => Json(Paginated::<EmailLog>::default()).into_response(),
        Err(rejection) => rejection,
    }
}

async fn dashboard_stats(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    let (_, environment) = match backend.authenticate(&headers) {
        Ok(auth) => auth,
        Err(rejection) => return rejection,
    };
    let state = backend.lock();
    let count = |n: usize| u64::try_from(n).unwrap_or(u64::MAX);
    let stats = DashboardStats {
        total_templates: count(
            state
                .templates
                .iter()
                .filter(|t| t.environment == Some(environment))
                .count(),
        ),
        active_events: count(
            state
                .events
                .iter()
                .filter(|e| e.environment == Some(environment) && e.is_active)
                .count(),
        ),
        ..DashboardStats::default()
    };
    Json(stats).into_response()
}

async fn integrations(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    match backend.authenticate(&headers) {
        Ok(_) => Json(Paginated::<SesIntegration>::default()).into_response(),
        Err(rejection) => rejection,
    }
}

// =============================================================================
// Templates
// =============================================================================

async fn list_templates(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    match backend.authenticate(&headers) {
        Ok((_, environment)) => {
            Json(Paginated::single_page(backend.templates_in(environment))).into_response()
        }
        Err(rejection) => rejection,
    }
}

async fn get_template(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<TemplateId>,
) -> Response {
    let (_, environment) = match backend.authenticate(&headers) {
        Ok(auth) => auth,
        Err(rejection) => return rejection,
    };
    backend
        .templates_in(environment)
        .into_iter()
        .find(|t| t.id == id)
        .map_or_else(not_found, |t| Json(t).into_response())
}

async fn delete_template(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<TemplateId>,
) -> Response {
    let (_, environment) = match backend.authenticate(&headers) {
        Ok(auth) => auth,
        Err(rejection) => return rejection,
    };
    let mut state = backend.lock();
    let before = state.templates.len();
    state
        .templates
        .retain(|t| !(t.id == id && t.environment == Some(environment)));
    if state.templates.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn upload_template(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<UploadHtml>,
) -> Response {
    let (_, environment) = match backend.authenticate(&headers) {
        Ok(auth) => auth,
        Err(rejection) => return rejection,
    };
    if body.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "name": ["This field may not be blank."] })),
        )
            .into_response();
    }
    let template = backend.add_template(environment, &body.name, &body.subject, &body.html_content);
    (StatusCode::CREATED, Json(template)).into_response()
}

async fn promote_template(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<TemplateId>,
) -> Response {
    let (_, environment) = match backend.authenticate(&headers) {
        Ok(auth) => auth,
        Err(rejection) => return rejection,
    };
    let mut state = backend.lock();
    let Some(source) = state
        .templates
        .iter()
        .find(|t| t.id == id && t.environment == Some(environment))
        .cloned()
    else {
        return not_found();
    };
    if source.environment != Some(Environment::Sandbox) {
        return bad_request("Only sandbox templates can be promoted.");
    }

    // Promotion replaces a production template with the same name.
    state.templates.retain(|t| {
        !(t.environment == Some(Environment::Production) && t.name == source.name)
    });
    let mut promoted = new_template(
        &mut state,
        Environment::Production,
        &source.name,
        &source.subject,
        &source.html_content,
    );
    promoted.placeholders = source.placeholders;
    promoted.design_json = source.design_json;
    state.templates.push(promoted.clone());
    Json(promoted).into_response()
}

// =============================================================================
// Events
// =============================================================================

async fn list_events(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    let (_, environment) = match backend.authenticate(&headers) {
        Ok(auth) => auth,
        Err(rejection) => return rejection,
    };
    let events: Vec<Event> = backend
        .lock()
        .events
        .iter()
        .filter(|e| e.environment == Some(environment))
        .cloned()
        .collect();
    Json(Paginated::single_page(events)).into_response()
}

async fn get_event(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<EventId>,
) -> Response {
    let (_, environment) = match backend.authenticate(&headers) {
        Ok(auth) => auth,
        Err(rejection) => return rejection,
    };
    backend
        .lock()
        .events
        .iter()
        .find(|e| e.id == id && e.environment == Some(environment))
        .cloned()
        .map_or_else(not_found, |e| Json(e).into_response())
}

async fn create_event(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(input): Json<EventInput>,
) -> Response {
    let (_, environment) = match backend.authenticate(&headers) {
        Ok(auth) => auth,
        Err(rejection) => return rejection,
    };
    let mut state = backend.lock();
    let template_name = input.template.and_then(|id| {
        state
            .templates
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.clone())
    });
    let now = Utc::now();
    let event = Event {
        id: EventId::new(state.next_id()),
        slug: slugify(&input.name),
        name: input.name,
        description: input.description,
        environment: Some(environment),
        template: input.template,
        template_name,
        integration: input.integration,
        integration_name: None,
        is_active: input.is_active,
        created_at: now,
        updated_at: now,
    };
    state.events.push(event.clone());
    (StatusCode::CREATED, Json(event)).into_response()
}

async fn promote_event(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Path(id): Path<EventId>,
) -> Response {
    let (_, environment) = match backend.authenticate(&headers) {
        Ok(auth) => auth,
        Err(rejection) => return rejection,
    };
    let mut state = backend.lock();
    let Some(source) = state
        .events
        .iter()
        .find(|e| e.id == id && e.environment == Some(environment))
        .cloned()
    else {
        return not_found();
    };
    if source.environment != Some(Environment::Sandbox) {
        return bad_request("Only sandbox events can be promoted.");
    }

    let mut warnings = Vec::new();
    let production_template = source.template_name.as_ref().and_then(|name| {
        let found = state
            .templates
            .iter()
            .find(|t| t.environment == Some(Environment::Production) && &t.name == name)
            .map(|t| t.id);
        if found.is_none() {
            warnings.push(format!(
                "Template \"{name}\" has not been promoted to production yet."
            ));
        }
        found
    });

    state.events.retain(|e| {
        !(e.environment == Some(Environment::Production) && e.slug == source.slug)
    });
    let now = Utc::now();
    let event = Event {
        id: EventId::new(state.next_id()),
        environment: Some(Environment::Production),
        template: production_template,
        template_name: production_template.and(source.template_name.clone()),
        integration: None,
        integration_name: None,
        created_at: now,
        updated_at: now,
        ..source
    };
    state.events.push(event.clone());

    Json(PromotedEvent { event, warnings }).into_response()
}
