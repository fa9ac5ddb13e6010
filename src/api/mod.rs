//! API access for the mailer dashboard.
//!
//! Provides the shared HTTP client with bearer-token injection and failure
//! normalization, session credential storage, and typed wrappers for the
//! backend's stats, template and task endpoints.

pub mod auth;
pub mod client;
pub mod error;
pub mod stats;
pub mod tasks;
pub mod templates;
pub mod types;

pub use client::{ApiClient, ApiRequest};
pub use error::{ApiError, FALLBACK_MESSAGE};
