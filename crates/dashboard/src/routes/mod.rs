//! HTTP route handlers for the dashboard.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Readiness check (API reachable)
//!
//! # Auth
//! GET  /login                        - Login page
//! POST /login                        - Login action
//! GET  /register                     - Register page (when sign-up is open)
//! POST /register                     - Register action
//! POST /logout                       - Logout action
//! GET  /forgot-password              - Forgot password page
//! POST /forgot-password              - Request a reset link
//! GET  /set-password                 - Accept an invitation
//! POST /set-password                 - Set the first password
//! GET  /reset-password               - Reset password page
//! POST /reset-password               - Reset password action
//!
//! # Dashboard (requires auth)
//! GET  /dashboard                    - Stats and recent sends
//! POST /environment                  - Switch sandbox/production (admins)
//!
//! # Templates
//! GET  /templates                    - Template list
//! POST /templates/upload             - Create from an HTML file (multipart)
//! GET  /templates/new                - Builder for a new template
//! POST /templates/builder            - Builder actions (save, insert, add placeholder)
//! GET  /templates/{id}/edit          - Builder for an existing template
//! POST /templates/{id}/promote       - Promote to production (sandbox only)
//! POST /templates/{id}/delete        - Delete
//! POST /templates/{id}/placeholders  - Save placeholder defaults
//! POST /templates/{id}/preview       - Rendered preview
//!
//! # Events
//! GET  /events                       - Event list
//! POST /events                       - Create
//! GET  /events/{id}                  - Detail, trigger snippet, test form
//! POST /events/{id}/update           - Update
//! POST /events/{id}/delete           - Delete
//! POST /events/{id}/promote          - Promote to production (sandbox only)
//! POST /events/{id}/test             - Queue a test send
//!
//! # SES Integrations
//! GET  /integrations                 - Integration list
//! POST /integrations                 - Create
//! POST /integrations/{id}/delete     - Delete
//! POST /integrations/{id}/verify     - Send the sender verification email
//! POST /integrations/{id}/check      - Re-check verification
//! POST /integrations/{id}/test       - Test the connection
//!
//! # Logs
//! GET  /logs                         - Filtered, paginated log list
//! GET  /logs/{id}                    - Log detail
//!
//! # API Keys
//! GET  /api-keys                     - Key list
//! POST /api-keys                     - Create (raw key shown once)
//! POST /api-keys/{id}/toggle         - Activate/deactivate
//! POST /api-keys/{id}/delete         - Delete
//!
//! # Brand Components
//! GET  /brand-components             - Library (?category=)
//! POST /brand-components             - Create
//! GET  /brand-components/{id}        - Edit page
//! POST /brand-components/{id}/update - Update
//! POST /brand-components/{id}/thumbnail - Upload a thumbnail (multipart)
//! POST /brand-components/{id}/delete - Delete
//!
//! # Users (admins only)
//! GET  /users                        - Member list
//! POST /users/invite                 - Invite
//! POST /users/{id}/update            - Update
//! POST /users/{id}/delete            - Remove
//!
//! # Media
//! POST /media/upload                 - Image upload (multipart, JSON response)
//! ```

pub mod api_keys;
pub mod auth;
pub mod brand_components;
pub mod dashboard;
pub mod events;
pub mod integrations;
pub mod logs;
pub mod media;
pub mod templates;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route(
            "/set-password",
            get(auth::set_password_page).post(auth::set_password),
        )
        .route(
            "/reset-password",
            get(auth::reset_password_page).post(auth::reset_password),
        )
}

/// Create the template routes router.
pub fn template_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(templates::index))
        .route("/upload", post(templates::upload))
        .route("/new", get(templates::new_template))
        .route("/builder", post(templates::save_builder))
        .route("/{id}/edit", get(templates::edit))
        .route("/{id}/promote", post(templates::promote))
        .route("/{id}/delete", post(templates::delete))
        .route("/{id}/placeholders", post(templates::placeholders))
        .route("/{id}/preview", post(templates::preview))
}

/// Create the event routes router.
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(events::index).post(events::create))
        .route("/{id}", get(events::detail))
        .route("/{id}/update", post(events::update))
        .route("/{id}/delete", post(events::delete))
        .route("/{id}/promote", post(events::promote))
        .route("/{id}/test", post(events::test))
}

/// Create the integration routes router.
pub fn integration_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(integrations::index).post(integrations::create))
        .route("/{id}/delete", post(integrations::delete))
        .route("/{id}/verify", post(integrations::verify))
        .route("/{id}/check", post(integrations::check))
        .route("/{id}/test", post(integrations::test))
}

/// Create the API key routes router.
pub fn api_key_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(api_keys::index).post(api_keys::create))
        .route("/{id}/toggle", post(api_keys::toggle))
        .route("/{id}/delete", post(api_keys::delete))
}

/// Create the brand component routes router.
pub fn brand_component_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(brand_components::index).post(brand_components::create))
        .route("/{id}", get(brand_components::edit))
        .route("/{id}/update", post(brand_components::update))
        .route("/{id}/thumbnail", post(brand_components::thumbnail))
        .route("/{id}/delete", post(brand_components::delete))
}

/// Create the user management routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index))
        .route("/invite", post(users::invite))
        .route("/{id}/update", post(users::update))
        .route("/{id}/delete", post(users::delete))
}

/// Create all page routes for the dashboard.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .route("/dashboard", get(dashboard::index))
        .route("/environment", post(dashboard::switch_environment))
        .nest("/templates", template_routes())
        .nest("/events", event_routes())
        .nest("/integrations", integration_routes())
        .route("/logs", get(logs::index))
        .route("/logs/{id}", get(logs::detail))
        .nest("/api-keys", api_key_routes())
        .nest("/brand-components", brand_component_routes())
        .nest("/users", user_routes())
        .route("/media/upload", post(media::upload))
}
