//! Application state shared across handlers.

use std::sync::Arc;

use xyno_client::{ApiClient, ApiError, LoginRedirect, Storage};

use crate::config::DashboardConfig;

/// Application state shared across all handlers.
///
/// Holds one pooled HTTP client. Each request builds its own [`ApiClient`]
/// on top of it, bound to that visitor's stored tokens and environment.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DashboardConfig,
    http: reqwest::Client,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: DashboardConfig) -> Result<Self, ApiError> {
        let client_config = config.client_config();
        let http = reqwest::Client::builder()
            .timeout(client_config.timeout)
            .user_agent(concat!("xyno-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(AppStateInner { config, http }),
        })
    }

    /// Get the dashboard configuration.
    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    /// Build an API client for one request.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured API URL is invalid.
    pub fn api_client(
        &self,
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn LoginRedirect>,
    ) -> Result<ApiClient, ApiError> {
        ApiClient::builder(self.inner.config.client_config())
            .storage(storage)
            .navigator(navigator)
            .http_client(self.inner.http.clone())
            .build()
    }
}
