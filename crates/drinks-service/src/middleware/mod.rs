//! HTTP middleware for the drinks service.
//!
//! # Components
//!
//! - `auth` - Token gate middleware for protected routes
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{require_permission, AuthState};
pub use http_metrics::http_metrics_middleware;
