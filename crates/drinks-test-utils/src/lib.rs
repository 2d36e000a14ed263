//! # Drinks Test Utilities
//!
//! Shared test utilities for the drinks service.
//!
//! This crate provides:
//! - Deterministic RSA and Ed25519 signing keys with their public JWKs
//! - A fluent builder for signed bearer tokens
//! - A wiremock-backed JWKS endpoint
//! - Server test harness (`TestDrinksServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use drinks_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestDrinksServer::spawn().await?;
//!     let client = reqwest::Client::new();
//!
//!     let response = client
//!         .get(format!("{}/drinks-detail", server.url()))
//!         .header("Authorization", server.bearer(&["get:drinks-detail"]))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::{TestEd25519Key, TestRsaKey};
pub use jwks_mock::MockJwksServer;
pub use server_harness::*;
pub use token_builders::TestTokenBuilder;
