//! Xyno Dashboard library.
//!
//! Server-rendered management UI for the Xyno email API: templates, events,
//! SES integrations, send logs, API keys, brand components and team members.
//! Every page is rendered from API data fetched with the visitor's own tokens
//! and selected environment; the dashboard keeps no data of its own.
//!
//! The router is exposed as a library so it can be driven in-process by the
//! integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod page;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{Request, Response, StatusCode},
    middleware::from_fn_with_state,
    response::Redirect,
    routing::get,
};
use tower_http::{
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;
use xyno_client::{MemoryStorage, NoopRedirect, resources::auth};

use crate::middleware::{client_context, create_session_layer};
use crate::state::AppState;

/// Build the complete dashboard router.
///
/// Layers, innermost first: the per-request API client, the session store
/// and request tracing. Unknown paths redirect to the dashboard.
pub fn router(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new("crates/dashboard/static"))
        .fallback(|| async { Redirect::to("/dashboard") })
        .layer(from_fn_with_state(state.clone(), client_context))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the API is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let client = match state.api_client(Arc::new(MemoryStorage::new()), Arc::new(NoopRedirect)) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build readiness client");
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    };

    match auth::registration_status(&client).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "API not reachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
