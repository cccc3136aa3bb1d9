//! Xyno Core - Shared types library.
//!
//! This crate provides common types used across all Xyno dashboard components:
//! - `client` - Environment-scoped REST client for the Xyno API
//! - `dashboard` - Server-rendered management dashboard
//! - `cli` - Command-line client
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no I/O,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, the environment and status enums
//! - [`models`] - Resource records exchanged with the REST API
//! - [`placeholder`] - Template placeholder names and defaults
//! - [`design`] - Template builder helpers (design formats, document assembly)
//! - [`snippet`] - Event trigger snippet generation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod design;
pub mod models;
pub mod placeholder;
pub mod snippet;
pub mod types;

pub use models::*;
pub use placeholder::{Placeholder, PlaceholderError, PlaceholderSet};
pub use types::*;
