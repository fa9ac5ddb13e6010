//! Navigation and API access layer for the mailer dashboard.
//!
//! Two independent pieces, hosted by the `mailer-console` binary:
//! - [`nav`]: resolves locations to routes and loads each route's screen
//!   lazily, once;
//! - [`api`]: the shared HTTP client that injects the session token and turns
//!   every failure into one user-visible notification.

pub mod api;
pub mod commands;
pub mod config;
pub mod nav;
pub mod notify;
pub mod state;
