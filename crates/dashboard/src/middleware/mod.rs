//! HTTP middleware stack for the dashboard.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with the in-memory store)
//! 4. Client context (per-request API client bound to the session)
//!
//! Page handlers then opt into authentication through the extractors in
//! [`auth`].

pub mod auth;
pub mod client;
pub mod session;

pub use auth::{CurrentUser, OptionalAuth, RequireAdmin, RequireAuth, forget_user, remember_user};
pub use client::{ClientContext, client_context, session_keys};
pub use session::create_session_layer;
