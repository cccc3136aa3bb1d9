//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::ApiError;

/// Default API root used by a local backend.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for building an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root every resource path is joined to.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("xyno-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at `base_url` with default settings.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Parse the base URL, normalized to end with a slash so that
    /// [`Url::join`] appends resource paths instead of replacing the last
    /// segment.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the base URL cannot be parsed or
    /// cannot carry a path.
    pub fn parsed_base_url(&self) -> Result<Url, ApiError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!("{raw}: cannot be a base URL")));
        }
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("xyno-client/"));
    }

    #[test]
    fn test_parsed_base_url_gets_trailing_slash() {
        let url = ClientConfig::with_base_url("http://api.test/api")
            .parsed_base_url()
            .unwrap();
        assert_eq!(url.as_str(), "http://api.test/api/");
        assert_eq!(
            url.join("templates/").unwrap().as_str(),
            "http://api.test/api/templates/"
        );
    }

    #[test]
    fn test_parsed_base_url_rejects_garbage() {
        assert!(matches!(
            ClientConfig::with_base_url("not a url").parsed_base_url(),
            Err(ApiError::InvalidUrl(_))
        ));
        assert!(ClientConfig::with_base_url("mailto:x@y.z").parsed_base_url().is_err());
    }
}
