//! Drinks Service Library
//!
//! Core functionality for the coffee shop drink menu API:
//!
//! - Public menu listing
//! - Recipe details and menu changes for authorized staff
//! - Bearer token verification against the identity provider's published keys
//! - Per-route permission checks
//!
//! # Architecture
//!
//! Requests flow through the token gate before reaching protected handlers:
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> handlers/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token gate, key discovery, token verification
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authorization and HTTP metrics middleware
//! - `models` - Data models
//! - `observability` - Prometheus metrics
//! - `repositories` - Drink storage
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
