//! Authentication and authorization for the drinks service.
//!
//! Bearer tokens are issued by an external identity provider and verified
//! against the signing keys it publishes.
//!
//! # Components
//!
//! - `gate` - Token gate composing extraction, verification and permission check
//! - `jwks` - Key discovery (HTTP JWKS client, static key source)
//! - `jwt` - Token verification and claim validation
//! - `permissions` - Permission names and the permission check
//! - `claims` - Claim set of a verified token
//! - `error` - Classified auth failures

pub mod claims;
pub mod error;
pub mod gate;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::Claims;
pub use error::AuthError;
pub use gate::TokenGate;
pub use jwks::{JwksClient, KeySource, StaticKeySource};
pub use jwt::JwtValidator;
pub use permissions::{check_permission, Permission};
