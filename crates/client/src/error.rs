//! Client error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`Storage`](crate::Storage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file does not contain a JSON object of strings.
    #[error("Corrupt storage file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A writer panicked while holding the storage lock.
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Errors returned by API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },

    /// The access token was rejected and could not be refreshed. Stored
    /// tokens have been cleared and the login redirect has been signalled.
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// A success response could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The configured base URL or a resource path is invalid.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// Persisting client state failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// HTTP status of an API rejection.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }

    /// Whether the caller is not (or no longer) authenticated.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::SessionExpired) || matches!(self.status(), Some(401))
    }

    /// Short message suitable for a notification banner.
    ///
    /// API rejections carry error bodies of the form `{"detail": "..."}`,
    /// `{"error": "..."}` or `{"field": ["..."]}`; the first message found is
    /// used.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { status, body } => {
                extract_api_message(body).unwrap_or_else(|| format!("Request failed ({status})"))
            }
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            Self::Http(_) => "Could not reach the Xyno API".to_string(),
            Self::Validation(message) => message.clone(),
            Self::Parse(_) | Self::InvalidUrl(_) | Self::Storage(_) => {
                "Something went wrong".to_string()
            }
        }
    }

    /// Every message in an API rejection body, ordered by field name.
    ///
    /// Used where a form reports all of its problems at once. Empty for
    /// anything but a JSON object body.
    #[must_use]
    pub fn all_messages(&self) -> Vec<String> {
        match self {
            Self::Status { body, .. } => collect_api_messages(body),
            Self::Validation(message) => vec![message.clone()],
            _ => Vec::new(),
        }
    }
}

fn collect_api_messages(body: &str) -> Vec<String> {
    let Ok(serde_json::Value::Object(object)) = serde_json::from_str(body) else {
        return Vec::new();
    };
    object
        .values()
        .flat_map(|messages| match messages {
            serde_json::Value::String(s) => vec![s.clone()],
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        })
        .collect()
}

/// Pull the first human-readable message out of an API error body.
fn extract_api_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    for key in ["detail", "error"] {
        if let Some(message) = object.get(key).and_then(serde_json::Value::as_str) {
            return Some(message.to_string());
        }
    }

    object.iter().find_map(|(field, messages)| {
        let message = match messages {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items.first()?.as_str()?.to_string(),
            _ => return None,
        };
        if field == "non_field_errors" {
            Some(message)
        } else {
            Some(format!("{field}: {message}"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16, body: &str) -> ApiError {
        ApiError::Status {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_user_message_prefers_detail() {
        let err = status_error(400, r#"{"detail": "Only sandbox events can be promoted."}"#);
        assert_eq!(err.user_message(), "Only sandbox events can be promoted.");

        let err = status_error(400, r#"{"error": "No file provided."}"#);
        assert_eq!(err.user_message(), "No file provided.");
    }

    #[test]
    fn test_user_message_field_errors() {
        let err = status_error(400, r#"{"username": ["A user with that username already exists."]}"#);
        assert_eq!(
            err.user_message(),
            "username: A user with that username already exists."
        );

        let err = status_error(400, r#"{"non_field_errors": ["Passwords do not match."]}"#);
        assert_eq!(err.user_message(), "Passwords do not match.");
    }

    #[test]
    fn test_user_message_fallback() {
        assert_eq!(status_error(502, "<html>bad gateway</html>").user_message(), "Request failed (502)");
        assert_eq!(
            ApiError::Validation("Passwords do not match".to_string()).user_message(),
            "Passwords do not match"
        );
    }

    #[test]
    fn test_all_messages_flattens_fields() {
        let err = status_error(
            400,
            r#"{"username": ["A user with that username already exists."], "password": ["This password is too short.", "This password is too common."]}"#,
        );
        assert_eq!(err.all_messages().len(), 3);
        assert!(status_error(500, "oops").all_messages().is_empty());
    }

    #[test]
    fn test_status_helpers() {
        assert!(status_error(404, "").is_not_found());
        assert!(status_error(401, "").is_unauthorized());
        assert!(ApiError::SessionExpired.is_unauthorized());
        assert!(!status_error(403, "").is_unauthorized());
        assert_eq!(ApiError::SessionExpired.status(), None);
    }
}
