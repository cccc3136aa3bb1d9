//! Per-request API client.
//!
//! A visitor's tokens and selected environment live in their tower-session
//! as a flat key/value snapshot. For every request the snapshot seeds a
//! [`MemoryStorage`] and an [`ApiClient`] is built on it and handed to the
//! handler through [`ClientContext`]. Whatever the client wrote while the
//! handler ran (refreshed tokens, a switched environment, a sign-out) is
//! persisted afterwards. Only the keys it changed are written, on top of the
//! stored session, so overlapping requests do not undo each other.
//!
//! If the client signalled that the visitor has to sign in again, the
//! handler's response is replaced with a redirect to the login page.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{error, warn};
use xyno_client::{ApiClient, MemoryStorage, RecordingRedirect};

use crate::error::AppError;
use crate::state::AppState;

/// Session keys used by the dashboard.
pub mod session_keys {
    /// Snapshot of the client storage (tokens and environment).
    pub const CLIENT_STORAGE: &str = "xyno.client_storage";
    /// Profile of the signed-in user, cached after the first lookup.
    pub const CURRENT_USER: &str = "xyno.current_user";
}

/// The request's API client.
#[derive(Clone, Debug)]
pub struct ClientContext {
    client: ApiClient,
}

impl ClientContext {
    #[must_use]
    pub const fn client(&self) -> &ApiClient {
        &self.client
    }
}

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::Internal("client context middleware not installed".to_string()))
    }
}

/// Middleware that binds an [`ApiClient`] to the visitor's session.
pub async fn client_context(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let snapshot: HashMap<String, String> = match session
        .get(session_keys::CLIENT_STORAGE)
        .await
    {
        Ok(snapshot) => snapshot.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Failed to read client storage from session");
            HashMap::new()
        }
    };

    let user_before = session
        .get_value(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten();

    let storage = Arc::new(MemoryStorage::from_snapshot(snapshot.clone()));
    let navigator = Arc::new(RecordingRedirect::new());
    let client = match state.api_client(storage.clone(), navigator.clone()) {
        Ok(client) => client,
        Err(e) => return AppError::from(e).into_response(),
    };

    request.extensions_mut().insert(ClientContext { client });
    let response = next.run(request).await;

    let changes = changed_entries(&snapshot, &storage.snapshot());
    if !changes.is_empty()
        && let Err(e) = persist_changes(&session, user_before, changes).await
    {
        error!(error = %e, "Failed to persist client storage to session");
    }

    if navigator.was_redirected() {
        if let Err(e) = session.remove_value(session_keys::CURRENT_USER).await {
            error!(error = %e, "Failed to drop cached user from session");
        }
        return Redirect::to("/login").into_response();
    }

    response
}

/// A storage key this request set (`Some`) or removed (`None`).
type Change = (String, Option<String>);

/// Entries that differ between the snapshot a request started from and the
/// one it ended with.
fn changed_entries(before: &HashMap<String, String>, after: &HashMap<String, String>) -> Vec<Change> {
    let set = after
        .iter()
        .filter(|(key, value)| before.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), Some(value.clone())));
    let removed = before
        .keys()
        .filter(|key| !after.contains_key(*key))
        .map(|key| (key.clone(), None));
    set.chain(removed).collect()
}

fn apply_changes(target: &mut HashMap<String, String>, changes: Vec<Change>) {
    for (key, value) in changes {
        match value {
            Some(value) => target.insert(key, value),
            None => target.remove(&key),
        };
    }
}

/// Write `changes` on top of the stored session rather than the copy loaded
/// when the request began, so that a concurrent request's writes (an
/// environment switch during a slow token refresh) are kept.
async fn persist_changes(
    session: &Session,
    user_before: Option<serde_json::Value>,
    changes: Vec<Change>,
) -> Result<(), tower_sessions::session::Error> {
    let user_after = session.get_value(session_keys::CURRENT_USER).await?;

    // A cycled id has no stored record yet.
    if session.id().is_some() {
        session.load().await?;
    }

    let mut latest: HashMap<String, String> = session
        .get(session_keys::CLIENT_STORAGE)
        .await?
        .unwrap_or_default();
    apply_changes(&mut latest, changes);
    session.insert(session_keys::CLIENT_STORAGE, &latest).await?;

    // The reload dropped whatever the handler did to the cached profile.
    if user_after != user_before {
        match user_after {
            Some(user) => {
                session.insert_value(session_keys::CURRENT_USER, user).await?;
            }
            None => {
                session.remove_value(session_keys::CURRENT_USER).await?;
            }
        }
    }
    Ok(())
}
