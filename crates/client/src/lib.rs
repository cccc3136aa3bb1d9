//! Xyno API client library.
//!
//! Every dashboard surface talks to the Xyno REST API through this crate.
//! It owns the pieces of client state that outlive a single request:
//!
//! - [`storage`] - durable key/value storage for tokens and the environment
//! - [`environment`] - the sandbox/production selection
//! - [`http`] - the request pipeline (bearer token, `X-Environment` header,
//!   single-flight token refresh on 401)
//! - [`session`] - the signed-in user and login/register/logout flows
//! - [`resources`] - one thin wrapper per REST resource
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use xyno_client::{ApiClient, ClientConfig, MemoryStorage, resources::templates};
//!
//! # async fn run() -> Result<(), xyno_client::ApiError> {
//! let client = ApiClient::builder(ClientConfig::default())
//!     .storage(Arc::new(MemoryStorage::new()))
//!     .build()?;
//!
//! let page = templates::list(&client).await?;
//! println!("{} templates in {}", page.count, client.environment().current());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod environment;
pub mod error;
pub mod http;
pub mod navigator;
pub mod resources;
pub mod session;
pub mod storage;

pub use config::ClientConfig;
pub use environment::EnvironmentState;
pub use error::{ApiError, StorageError};
pub use http::{ApiClient, ApiClientBuilder, ENVIRONMENT_HEADER, Upload};
pub use navigator::{LoginRedirect, NoopRedirect, RecordingRedirect};
pub use resources::auth::{Registration, TokenPair};
pub use session::{AuthSession, SessionState};
pub use storage::{FileStorage, MemoryStorage, Storage};
