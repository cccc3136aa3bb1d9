//! Page chrome shared by every signed-in page: the sidebar, the environment
//! switcher and the notification banner.
//!
//! Notifications travel as `?success=`, `?error=` and `?warning=` query
//! parameters on redirects and are rendered once by the next page.

use axum::response::Redirect;
use serde::Deserialize;
use xyno_client::ApiError;
use xyno_core::Environment;

use crate::middleware::CurrentUser;

/// Notification banner query parameters.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MessageQuery {
    pub success: Option<String>,
    pub error: Option<String>,
    pub warning: Option<String>,
}

/// Sidebar entry.
#[derive(Debug, Clone, Copy)]
pub struct NavItem {
    pub href: &'static str,
    pub label: &'static str,
    pub admin_only: bool,
}

static NAV_ITEMS: [NavItem; 8] = [
    NavItem { href: "/dashboard", label: "Dashboard", admin_only: false },
    NavItem { href: "/integrations", label: "SES Integrations", admin_only: false },
    NavItem { href: "/templates", label: "Templates", admin_only: false },
    NavItem { href: "/brand-components", label: "Brand", admin_only: false },
    NavItem { href: "/events", label: "Events", admin_only: false },
    NavItem { href: "/logs", label: "Logs", admin_only: false },
    NavItem { href: "/api-keys", label: "API Keys", admin_only: false },
    NavItem { href: "/users", label: "User Management", admin_only: true },
];

/// Everything the base layout needs.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub environment: Environment,
    pub current_path: String,
    pub success: Option<String>,
    pub error: Option<String>,
    pub warning: Option<String>,
}

impl PageContext {
    #[must_use]
    pub fn new(current: &CurrentUser, current_path: &str, messages: MessageQuery) -> Self {
        Self {
            username: current.user.username.clone(),
            email: current.user.email.clone(),
            is_admin: current.is_admin(),
            environment: current.environment(),
            current_path: current_path.to_string(),
            success: messages.success.filter(|s| !s.is_empty()),
            error: messages.error.filter(|s| !s.is_empty()),
            warning: messages.warning.filter(|s| !s.is_empty()),
        }
    }

    /// Replace the error banner.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sidebar entries visible to this user.
    #[must_use]
    pub fn nav_items(&self) -> Vec<&'static NavItem> {
        NAV_ITEMS
            .iter()
            .filter(|item| self.is_admin || !item.admin_only)
            .collect()
    }

    #[must_use]
    pub fn is_active(&self, href: &str) -> bool {
        self.current_path == href
            || self
                .current_path
                .strip_prefix(href)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    #[must_use]
    pub const fn is_sandbox(&self) -> bool {
        self.environment.is_sandbox()
    }
}

/// Which banner a redirect should raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Success,
    Error,
    Warning,
}

impl Flash {
    const fn param(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Redirect to `path` with a notification.
#[must_use]
pub fn redirect_with(path: &str, flash: Flash, message: &str) -> Redirect {
    let separator = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!(
        "{path}{separator}{}={}",
        flash.param(),
        urlencoding::encode(message)
    ))
}

/// Banner text for a failed API call: the generic `context`, followed by
/// the API's own explanation when it gave one.
#[must_use]
pub fn failure_message(context: &str, error: &ApiError) -> String {
    match error {
        ApiError::Validation(message) => message.clone(),
        ApiError::Status { .. } => format!("{context}: {}", error.user_message()),
        _ => context.to_string(),
    }
}

/// Only same-site paths are accepted as redirect targets.
#[must_use]
pub fn safe_return_path(candidate: Option<&str>, fallback: &'static str) -> String {
    match candidate {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    fn location(redirect: Redirect) -> String {
        redirect.into_response().headers()["location"]
            .to_str()
            .map(str::to_string)
            .unwrap_or_default()
    }

    #[test]
    fn test_redirect_with_encodes_message() {
        assert_eq!(
            location(redirect_with("/templates", Flash::Success, "Template deleted")),
            "/templates?success=Template%20deleted"
        );
        assert_eq!(
            location(redirect_with("/logs?page=2", Flash::Error, "Failed to load logs")),
            "/logs?page=2&error=Failed%20to%20load%20logs"
        );
    }

    #[test]
    fn test_failure_message_appends_api_detail() {
        let rejected = ApiError::Status {
            status: 400,
            body: r#"{"detail": "Template is not in sandbox"}"#.to_string(),
        };
        assert_eq!(
            failure_message("Failed to promote template", &rejected),
            "Failed to promote template: Template is not in sandbox"
        );
        assert_eq!(
            failure_message("Failed to save event", &ApiError::Validation("Name is required".into())),
            "Name is required"
        );
        assert_eq!(
            failure_message("Failed to load logs", &ApiError::SessionExpired),
            "Failed to load logs"
        );
    }

    #[test]
    fn test_safe_return_path() {
        assert_eq!(safe_return_path(Some("/templates"), "/dashboard"), "/templates");
        assert_eq!(safe_return_path(Some("//evil.test"), "/dashboard"), "/dashboard");
        assert_eq!(safe_return_path(Some("https://evil.test"), "/dashboard"), "/dashboard");
        assert_eq!(safe_return_path(None, "/dashboard"), "/dashboard");
    }
}
