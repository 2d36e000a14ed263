//! Classified authentication and authorization failures.
//!
//! Every failure in the token pipeline maps to exactly one variant. Each
//! variant carries a fixed machine-readable code, a client-facing
//! description, and an HTTP status:
//!
//! | code | status | meaning |
//! |------|--------|---------|
//! | `authorization_header_missing` | 401 | no credential presented |
//! | `invalid_header` | 401 | credential presented in the wrong shape |
//! | `invalid_header` | 400 | token cannot be parsed or verified |
//! | `token_expired` | 401 | token was valid but has expired |
//! | `invalid_claims` | 401 | audience/issuer/temporal claims rejected |
//! | `invalid_claims` | 400 | claims missing or of the wrong type |
//! | `unauthorized` | 403 | verified, but lacks the required permission |
//!
//! Expiry is kept apart from other claim failures so that clients can tell
//! "refresh your token" from "this token will never be valid".

use thiserror::Error;

/// Authentication or authorization failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header on the request.
    #[error("Authorization header is expected.")]
    HeaderMissing,

    /// Scheme is not `Bearer` (case-insensitive), or the value is empty.
    #[error("Authorization header must start with \"Bearer\".")]
    SchemeNotBearer,

    /// `Bearer` with no token after it.
    #[error("Token not found.")]
    TokenNotFound,

    /// More than two whitespace-separated parts.
    #[error("Authorization header must be bearer token.")]
    NotBearerToken,

    /// Token header carries no key identifier.
    #[error("Authorization malformed.")]
    MissingKeyId,

    /// The key set could not be fetched or parsed.
    #[error("Unable to fetch signing keys.")]
    KeyDiscoveryFailed,

    /// No published key matches the token's key identifier.
    #[error("Unable to find the appropriate key.")]
    KeyNotFound,

    /// Token or key material could not be parsed, or the signature is invalid.
    #[error("Unable to parse authentication token.")]
    UnparseableToken,

    /// Token `exp` is in the past.
    #[error("Token expired.")]
    TokenExpired,

    /// Audience, issuer, required-claim or not-before/issued-at validation failed.
    #[error("Incorrect claims. Please, check the audience and issuer.")]
    InvalidClaims,

    /// Verified claims do not have the expected shape.
    #[error("Unable to parse the token claims.")]
    MalformedClaims,

    /// Verified token has no `permissions` claim at all.
    #[error("Permissions not included in JWT.")]
    PermissionsMissing,

    /// Verified token does not grant the required permission.
    #[error("Permission not found.")]
    PermissionDenied,
}

impl AuthError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::HeaderMissing => "authorization_header_missing",
            AuthError::SchemeNotBearer
            | AuthError::TokenNotFound
            | AuthError::NotBearerToken
            | AuthError::MissingKeyId
            | AuthError::KeyDiscoveryFailed
            | AuthError::KeyNotFound
            | AuthError::UnparseableToken => "invalid_header",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims
            | AuthError::MalformedClaims
            | AuthError::PermissionsMissing => "invalid_claims",
            AuthError::PermissionDenied => "unauthorized",
        }
    }

    /// HTTP status code for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::HeaderMissing
            | AuthError::SchemeNotBearer
            | AuthError::TokenNotFound
            | AuthError::NotBearerToken
            | AuthError::MissingKeyId
            | AuthError::TokenExpired
            | AuthError::InvalidClaims => 401,
            AuthError::KeyDiscoveryFailed
            | AuthError::KeyNotFound
            | AuthError::UnparseableToken
            | AuthError::MalformedClaims
            | AuthError::PermissionsMissing => 400,
            AuthError::PermissionDenied => 403,
        }
    }

    /// Client-facing description.
    pub fn description(&self) -> String {
        self.to_string()
    }
}
