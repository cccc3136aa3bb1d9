//! Unified error handling for the dashboard.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use xyno_client::ApiError;

/// Application-level error type for page handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// A call to the Xyno API failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Api(ApiError::Status { status, .. }) => *status >= 500,
            Self::Api(ApiError::SessionExpired | ApiError::Validation(_))
            | Self::NotFound(_)
            | Self::Forbidden(_)
            | Self::BadRequest(_) => false,
            Self::Api(_) => true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Dashboard request error"
            );
        }

        let status = match &self {
            // The client middleware turns this into a login redirect.
            Self::Api(ApiError::SessionExpired) => return Redirect::to("/login").into_response(),
            Self::Api(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Api(ApiError::Status { status: 403, .. }) | Self::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            Self::Api(ApiError::Validation(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Api(ApiError::Status { status, .. }) if *status < 500 => StatusCode::BAD_REQUEST,
            Self::Api(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Api(e) => e.user_message(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Set the Sentry user context for the signed-in dashboard user.
pub fn set_sentry_user(user_id: i64, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("template 12".to_string());
        assert_eq!(err.to_string(), "Not found: template 12");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_status_codes() {
        fn api_status(status: u16) -> StatusCode {
            AppError::Api(ApiError::Status {
                status,
                body: String::new(),
            })
            .into_response()
            .status()
        }

        assert_eq!(api_status(404), StatusCode::NOT_FOUND);
        assert_eq!(api_status(403), StatusCode::FORBIDDEN);
        assert_eq!(api_status(400), StatusCode::BAD_REQUEST);
        assert_eq!(api_status(503), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_session_expired_redirects_to_login() {
        let response = AppError::Api(ApiError::SessionExpired).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }
}
