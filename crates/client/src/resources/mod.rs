//! One module per REST resource.
//!
//! Every function maps to a single API call through the shared
//! [`ApiClient`](crate::ApiClient), so each one is scoped to the currently
//! selected environment and participates in token refresh. Paths are
//! relative to the client's base URL and keep the trailing slash the API
//! routes require.

pub mod api_keys;
pub mod auth;
pub mod brand_components;
pub mod events;
pub mod integrations;
pub mod logs;
pub mod media;
pub mod templates;
pub mod users;
