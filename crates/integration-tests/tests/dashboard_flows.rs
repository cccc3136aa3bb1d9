//! Browser-level flows through the dashboard.
//!
//! The dashboard router runs in-process on an ephemeral port, pointed at the
//! mock API. A cookie-keeping HTTP client plays the browser.
//!
//! Run with: cargo test -p xyno-integration-tests

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use xyno_core::{Environment, UserRole};
use xyno_dashboard::{config::DashboardConfig, state::AppState};
use xyno_integration_tests::MockBackend;

const PASSWORD: &str = "testpass123!";

struct Browser {
    backend: MockBackend,
    http: reqwest::Client,
    /// Same cookies as `http`, but stops at redirects.
    no_follow: reqwest::Client,
    base: String,
}

impl Browser {
    async fn start() -> Self {
        let backend = MockBackend::start().await.expect("Failed to start mock API");
        let state = AppState::new(DashboardConfig::for_api(backend.api_url()))
            .expect("Failed to build dashboard state");
        let app = xyno_dashboard::router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind dashboard");
        let addr = listener.local_addr().expect("Failed to read dashboard address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .build()
            .expect("Failed to build browser client");
        let no_follow = reqwest::Client::builder()
            .cookie_provider(jar)
            .redirect(Policy::none())
            .build()
            .expect("Failed to build browser client");

        Self {
            backend,
            http,
            no_follow,
            base: format!("http://{addr}"),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.http
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.http
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.post_form("/login", &[("username", username), ("password", password)])
            .await
    }

    async fn register(&self, username: &str) -> reqwest::Response {
        let email = format!("{username}@example.com");
        self.post_form(
            "/register",
            &[
                ("username", username),
                ("email", &email),
                ("company_name", "E2E Co"),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
            ],
        )
        .await
    }
}

async fn body(response: reqwest::Response) -> String {
    response.text().await.expect("Failed to read body")
}

// ============================================================================
// Authentication Flows
// ============================================================================

#[tokio::test]
async fn test_register_lands_on_dashboard() {
    let browser = Browser::start().await;

    let response = browser.register("e2etest_1").await;

    assert!(response.status().is_success());
    assert_eq!(response.url().path(), "/dashboard");
    let page = body(response).await;
    assert!(page.contains("Sent Today"));
}

#[tokio::test]
async fn test_duplicate_registration_shows_field_error() {
    let browser = Browser::start().await;
    browser.backend.add_user("taken", PASSWORD, UserRole::Admin);

    let response = browser.register("taken").await;

    assert_eq!(response.url().path(), "/register");
    assert!(
        response
            .url()
            .query()
            .is_some_and(|q| q.starts_with("error="))
    );
}

#[tokio::test]
async fn test_wrong_password_stays_on_login() {
    let browser = Browser::start().await;
    browser.backend.add_user("ada", PASSWORD, UserRole::Admin);

    let response = browser.login("ada", "not-the-password").await;

    assert_eq!(response.url().path(), "/login");
    let page = body(response).await;
    assert!(page.contains("No active account found with the given credentials"));
    assert_eq!(browser.backend.refresh_count(), 0);
}

#[tokio::test]
async fn test_protected_pages_redirect_to_login() {
    let browser = Browser::start().await;

    for path in ["/dashboard", "/templates", "/events", "/logs", "/api-keys"] {
        let response = browser.get(path).await;
        assert_eq!(response.url().path(), "/login", "{path} was not protected");
    }
}

#[tokio::test]
async fn test_logout_ends_session() {
    let browser = Browser::start().await;
    browser.backend.add_user("ada", PASSWORD, UserRole::Admin);
    assert_eq!(browser.login("ada", PASSWORD).await.url().path(), "/dashboard");

    let response = browser.post_form("/logout", &[]).await;
    assert_eq!(response.url().path(), "/login");

    let response = browser.get("/dashboard").await;
    assert_eq!(response.url().path(), "/login");
}

// ============================================================================
// Template Promotion Flow
// ============================================================================

#[tokio::test]
async fn test_upload_promote_and_view_in_production() {
    let browser = Browser::start().await;
    browser.register("e2etest_1").await;

    let html = "<html><body><p>Hello {{first_name}}</p></body></html>";
    let form = Form::new()
        .text("name", "Welcome Email")
        .text("subject", "Welcome, {{first_name}}")
        .part(
            "file",
            Part::bytes(html.as_bytes().to_vec())
                .file_name("welcome.html")
                .mime_str("text/html")
                .expect("valid mime type"),
        );
    let response = browser
        .http
        .post(browser.url("/templates/upload"))
        .multipart(form)
        .send()
        .await
        .expect("upload failed");
    assert_eq!(response.url().path(), "/templates");
    let page = body(response).await;
    assert!(page.contains("Template uploaded"));
    assert!(page.contains("Welcome Email"));

    let sandbox = browser.backend.templates_in(Environment::Sandbox);
    assert_eq!(sandbox.len(), 1);
    assert_eq!(sandbox[0].placeholders.len(), 1);
    let id = sandbox[0].id;

    let promote_action = format!("/templates/{id}/promote");
    assert!(page.contains(&promote_action));

    let response = browser.post_form(&promote_action, &[]).await;
    let page = body(response).await;
    assert!(page.contains("Template promoted to Production"));
    assert_eq!(browser.backend.templates_in(Environment::Production).len(), 1);

    let response = browser
        .post_form(
            "/environment",
            &[("environment", "production"), ("return_to", "/templates")],
        )
        .await;
    assert_eq!(response.url().path(), "/templates");
    let page = body(response).await;
    assert!(page.contains("Now viewing Production"));
    assert!(page.contains("Welcome Email"));
    assert!(!page.contains("/promote\""));

    let environments: Vec<_> = browser
        .backend
        .requests_to("templates/")
        .into_iter()
        .filter_map(|r| r.environment)
        .collect();
    assert_eq!(environments.last().map(String::as_str), Some("production"));
}

#[tokio::test]
async fn test_promote_refused_in_production() {
    let browser = Browser::start().await;
    browser.register("e2etest_1").await;
    let template =
        browser
            .backend
            .add_template(Environment::Sandbox, "Receipt", "Thanks", "<p>Thanks</p>");
    browser
        .post_form("/environment", &[("environment", "production")])
        .await;

    let response = browser
        .post_form(&format!("/templates/{}/promote", template.id), &[])
        .await;

    assert_eq!(response.url().path(), "/templates");
    assert!(body(response).await.contains("Only sandbox templates can be promoted"));
    assert!(browser.backend.templates_in(Environment::Production).is_empty());
    assert!(browser.backend.requests_to(&format!("templates/{}/promote/", template.id)).is_empty());
}

#[tokio::test]
async fn test_developer_cannot_switch_environment() {
    let browser = Browser::start().await;
    browser.backend.add_user("dev", PASSWORD, UserRole::Developer);
    browser.login("dev", PASSWORD).await;

    let response = browser
        .post_form(
            "/environment",
            &[("environment", "production"), ("return_to", "/templates")],
        )
        .await;

    assert_eq!(response.url().path(), "/templates");
    let page = body(response).await;
    assert!(page.contains("Only admins can switch environments."));
    let last = browser.backend.requests_to("templates/").pop();
    assert_eq!(last.and_then(|r| r.environment).as_deref(), Some("sandbox"));
}

// ============================================================================
// Token Expiry
// ============================================================================

#[tokio::test]
async fn test_expired_access_token_is_refreshed_transparently() {
    let browser = Browser::start().await;
    browser.register("e2etest_1").await;
    browser.backend.expire_access_tokens();

    let response = browser.get("/templates").await;

    assert_eq!(response.url().path(), "/templates");
    assert_eq!(browser.backend.refresh_count(), 1);

    // The refreshed token was persisted to the session.
    let response = browser.get("/templates").await;
    assert_eq!(response.url().path(), "/templates");
    assert_eq!(browser.backend.refresh_count(), 1);
}

#[tokio::test]
async fn test_revoked_refresh_token_returns_to_login() {
    let browser = Browser::start().await;
    browser.register("e2etest_1").await;
    browser.backend.expire_access_tokens();
    browser.backend.revoke_refresh_tokens();

    let response = browser.get("/templates").await;
    assert_eq!(response.url().path(), "/login");

    let response = browser.get("/dashboard").await;
    assert_eq!(response.url().path(), "/login");
}

#[tokio::test]
async fn test_environment_switch_survives_overlapping_refresh() {
    let browser = Browser::start().await;
    browser.register("e2etest_1").await;
    browser.backend.expire_access_tokens();

    // A page load that has to refresh its token first.
    let slow = {
        let http = browser.http.clone();
        let url = browser.url("/templates");
        tokio::spawn(async move { http.get(url).send().await })
    };
    while browser.backend.refresh_count() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    // Another tab switches environment while that refresh is in flight.
    let response = browser
        .no_follow
        .post(browser.url("/environment"))
        .form(&[("environment", "production"), ("return_to", "/templates")])
        .send()
        .await
        .expect("POST failed");
    assert!(response.status().is_redirection());

    let response = slow.await.expect("page load panicked").expect("GET failed");
    assert_eq!(response.url().path(), "/templates");

    let response = browser.get("/templates").await;
    assert_eq!(response.url().path(), "/templates");
    let last = browser.backend.requests_to("templates/").pop();
    assert_eq!(last.and_then(|r| r.environment).as_deref(), Some("production"));
    // The refreshed token was kept too.
    assert_eq!(browser.backend.refresh_count(), 1);
}
