//! Core types for Xyno.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod environment;
pub mod id;
pub mod status;

pub use email::{Email, EmailError};
pub use environment::Environment;
pub use id::*;
pub use status::*;
