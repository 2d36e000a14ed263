//! JWT utilities shared across the drinks service crates.
//!
//! This module provides the pieces of token handling that happen before or
//! around signature verification:
//! - Size limits for DoS prevention
//! - Key ID extraction from the unverified JWT header
//! - Clock skew bounds and `iat` validation
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing in this module verifies a signature; callers MUST still verify
//!   the token against the key selected by `kid`
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_kid, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! // Extract key ID for JWKS lookup
//! let kid = extract_kid(token)?;
//!
//! // After signature verification, validate iat
//! validate_iat(claims.iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. Typical access tokens issued by an identity provider
/// are well under 2KB even with a long permission list.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes per NIST SP 800-63B).
///
/// Tokens with an `iat` (issued-at) timestamp more than this amount in the
/// future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// Upper bound for configuration so a typo cannot disable the `iat` check.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT before verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("token exceeds maximum size")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("token is not a well-formed JWT")]
    MalformedToken,

    /// Token header decodes but carries no usable `kid`.
    #[error("token header has no key identifier")]
    MissingKid,

    /// Token `iat` claim is too far in the future.
    #[error("token issued-at is too far in the future")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// Used to select the verification key from the published key set.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the token signature
/// - The `kid` value must only be used for lookup in a trusted key set
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong number of segments, bad base64, or invalid JSON header
/// - `MissingKid` - Header is valid JSON but `kid` is absent, empty, or not a string
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let header = decode_header_segment(token)?;

    match header.get("kid") {
        Some(serde_json::Value::String(kid)) if !kid.is_empty() => Ok(kid.clone()),
        _ => Err(JwtValidationError::MissingKid),
    }
}

/// Decode the first of exactly three dot-separated segments as a JSON object.
fn decode_header_segment(
    token: &str,
) -> Result<serde_json::Map<String, serde_json::Value>, JwtValidationError> {
    let mut segments = token.split('.');
    let (Some(header_b64), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::debug!(
            target: "common.jwt",
            segments = token.split('.').count(),
            "Token rejected: expected header.payload.signature"
        );
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_b64).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Token header is not base64url");
        JwtValidationError::MalformedToken
    })?;

    match serde_json::from_slice(&header_bytes) {
        Ok(serde_json::Value::Object(header)) => Ok(header),
        Ok(_) => Err(JwtValidationError::MalformedToken),
        Err(e) => {
            tracing::debug!(target: "common.jwt", error = %e, "Token header is not JSON");
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// Rejects tokens minted in the future beyond the tolerated skew.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat` is more than
/// `clock_skew` ahead of the current time.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
