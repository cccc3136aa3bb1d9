//! End-to-end tests for the API client against the mock backend.
//!
//! Covers the request pipeline (bearer token, `X-Environment` header,
//! single-flight refresh) and the session flows built on it.
//!
//! Run with: cargo test -p xyno-integration-tests

use std::sync::Arc;

use secrecy::SecretString;
use xyno_client::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use xyno_client::{
    ApiClient, ApiError, AuthSession, ClientConfig, MemoryStorage, RecordingRedirect, Registration,
    Storage,
    resources::{events, templates},
};
use xyno_core::{Environment, EventInput, UserRole};
use xyno_integration_tests::MockBackend;

struct Harness {
    backend: MockBackend,
    client: ApiClient,
    storage: Arc<MemoryStorage>,
    navigator: Arc<RecordingRedirect>,
}

async fn harness() -> Harness {
    let backend = MockBackend::start().await.expect("Failed to start mock API");
    let storage = Arc::new(MemoryStorage::new());
    let navigator = Arc::new(RecordingRedirect::new());
    let client = ApiClient::builder(ClientConfig::with_base_url(backend.api_url()))
        .storage(storage.clone())
        .navigator(navigator.clone())
        .build()
        .expect("Failed to build API client");
    Harness {
        backend,
        client,
        storage,
        navigator,
    }
}

/// Create an account and store a token pair for it.
fn sign_in(h: &Harness, username: &str, role: UserRole) {
    h.backend.add_user(username, "testpass123!", role);
    let (access, refresh) = h
        .backend
        .issue_tokens(username)
        .expect("account was just created");
    h.client
        .store_tokens(&SecretString::from(access), &SecretString::from(refresh))
        .expect("Failed to store tokens");
}

// ============================================================================
// Request Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_every_request_carries_token_and_environment() {
    let h = harness().await;
    sign_in(&h, "ada", UserRole::Admin);

    templates::list(&h.client).await.expect("sandbox list");
    h.client
        .environment()
        .set(Environment::Production)
        .expect("Failed to switch environment");
    templates::list(&h.client).await.expect("production list");

    let recorded = h.backend.requests_to("templates/");
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].environment.as_deref(), Some("sandbox"));
    assert_eq!(recorded[1].environment.as_deref(), Some("production"));

    let token = h.storage.get(ACCESS_TOKEN_KEY).expect("token stored");
    for request in &recorded {
        assert_eq!(request.authorization, Some(format!("Bearer {token}")));
    }
}

#[tokio::test]
async fn test_environment_partitions_data() {
    let h = harness().await;
    sign_in(&h, "ada", UserRole::Admin);
    h.backend
        .add_template(Environment::Sandbox, "Welcome", "Hi {{name}}", "<p>Hi</p>");

    let sandbox = templates::list(&h.client).await.expect("sandbox list");
    assert_eq!(sandbox.count, 1);

    h.client
        .environment()
        .toggle()
        .expect("Failed to toggle environment");
    let production = templates::list(&h.client).await.expect("production list");
    assert!(production.is_empty());
}

#[tokio::test]
async fn test_developer_is_served_sandbox_in_production() {
    let h = harness().await;
    sign_in(&h, "dev", UserRole::Developer);
    h.backend
        .add_template(Environment::Sandbox, "Welcome", "Hi", "<p>Hi</p>");

    h.client
        .environment()
        .set(Environment::Production)
        .expect("Failed to switch environment");
    let page = templates::list(&h.client).await.expect("list");

    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].environment, Some(Environment::Sandbox));
}

// ============================================================================
// Token Refresh Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_expired_requests_share_one_refresh() {
    let h = harness().await;
    sign_in(&h, "ada", UserRole::Admin);
    let stale = h.storage.get(ACCESS_TOKEN_KEY);
    h.backend.expire_access_tokens();

    let calls = (0..5).map(|_| templates::list(&h.client));
    let results = futures::future::join_all(calls).await;

    for result in results {
        assert!(result.is_ok(), "request failed after refresh: {result:?}");
    }
    assert_eq!(h.backend.refresh_count(), 1);
    assert_ne!(h.storage.get(ACCESS_TOKEN_KEY), stale);
    assert!(!h.navigator.was_redirected());
}

#[tokio::test]
async fn test_failed_refresh_ends_session_once() {
    let h = harness().await;
    sign_in(&h, "ada", UserRole::Admin);
    h.backend.expire_access_tokens();
    h.backend.revoke_refresh_tokens();

    let calls = (0..3).map(|_| templates::list(&h.client));
    let results = futures::future::join_all(calls).await;

    for result in results {
        assert!(matches!(result, Err(ApiError::SessionExpired)));
    }
    assert_eq!(h.backend.refresh_count(), 1);
    assert_eq!(h.navigator.count(), 1);
    assert_eq!(h.storage.get(ACCESS_TOKEN_KEY), None);
    assert_eq!(h.storage.get(REFRESH_TOKEN_KEY), None);
}

// ============================================================================
// Session Flow Tests
// ============================================================================

#[tokio::test]
async fn test_register_signs_in_as_admin() {
    let h = harness().await;
    let session = AuthSession::new(h.client.clone());

    let registration = Registration {
        username: "e2etest_1".to_string(),
        email: "e2etest_1@example.com".to_string(),
        password: SecretString::from("testpass123!"),
        password_confirm: SecretString::from("testpass123!"),
        company_name: "E2E Co".to_string(),
    };
    let user = session
        .register(&registration)
        .await
        .expect("registration failed");

    assert_eq!(user.username, "e2etest_1");
    assert!(user.is_admin());
    assert!(session.is_authenticated());
    assert!(h.client.has_access_token());
}

#[tokio::test]
async fn test_wrong_password_does_not_refresh() {
    let h = harness().await;
    h.backend.add_user("ada", "testpass123!", UserRole::Admin);
    let session = AuthSession::new(h.client.clone());

    let err = session
        .login("ada", &SecretString::from("wrong"))
        .await
        .expect_err("login should fail");

    assert_eq!(err.status(), Some(401));
    assert_eq!(
        err.user_message(),
        "No active account found with the given credentials"
    );
    assert_eq!(h.backend.refresh_count(), 0);
    assert!(!h.navigator.was_redirected());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_initialize_restores_stored_session() {
    let h = harness().await;
    sign_in(&h, "ada", UserRole::Admin);

    let session = AuthSession::new(h.client.clone());
    let state = session.initialize().await;

    assert_eq!(state.user().map(|u| u.username.as_str()), Some("ada"));
}

#[tokio::test]
async fn test_logout_clears_tokens_without_calling_api() {
    let h = harness().await;
    sign_in(&h, "ada", UserRole::Admin);
    let before = h.backend.requests().len();

    AuthSession::new(h.client.clone()).logout();

    assert!(!h.client.has_access_token());
    assert_eq!(h.storage.get(REFRESH_TOKEN_KEY), None);
    assert!(h.navigator.was_redirected());
    assert_eq!(h.backend.requests().len(), before);
}

// ============================================================================
// Promotion Tests
// ============================================================================

#[tokio::test]
async fn test_event_promotion_warns_about_unpromoted_template() {
    let h = harness().await;
    sign_in(&h, "ada", UserRole::Admin);
    let template = h
        .backend
        .add_template(Environment::Sandbox, "Welcome", "Hi", "<p>Hi</p>");

    let event = events::create(
        &h.client,
        &EventInput {
            name: "User Signup".to_string(),
            description: String::new(),
            template: Some(template.id),
            integration: None,
            is_active: true,
        },
    )
    .await
    .expect("Failed to create event");
    assert_eq!(event.slug, "user-signup");

    let promoted = events::promote(&h.client, event.id)
        .await
        .expect("Failed to promote event");
    assert_eq!(promoted.event.environment, Some(Environment::Production));
    assert_eq!(
        promoted.warnings,
        vec!["Template \"Welcome\" has not been promoted to production yet.".to_string()]
    );

    templates::promote(&h.client, template.id)
        .await
        .expect("Failed to promote template");
    let promoted = events::promote(&h.client, event.id)
        .await
        .expect("Failed to promote event again");
    assert!(promoted.warnings.is_empty());
    assert!(promoted.event.template.is_some());
}

#[tokio::test]
async fn test_promoting_production_template_is_rejected() {
    let h = harness().await;
    sign_in(&h, "ada", UserRole::Admin);
    let template = h
        .backend
        .add_template(Environment::Production, "Receipt", "Thanks", "<p>Thanks</p>");
    h.client
        .environment()
        .set(Environment::Production)
        .expect("Failed to switch environment");

    let err = templates::promote(&h.client, template.id)
        .await
        .expect_err("promotion should fail");

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.user_message(), "Only sandbox templates can be promoted.");
}
