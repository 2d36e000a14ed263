//! Token verification and decoding.
//!
//! Validates bearer tokens against the signing keys published by the issuer.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only the configured algorithms that fit the selected key's type are accepted
//! - `exp`, `aud` and `iss` are required; expiry has no leeway
//! - Issued-at claims in the future are bounded by the configured clock skew
//! - The claim set is built only from a payload whose signature verified

use crate::auth::claims::Claims;
use crate::auth::error::AuthError;
use crate::auth::jwks::{Jwk, KeySource};
use crate::observability::metrics;
use common::jwt::{extract_kid, validate_iat, JwtValidationError};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Claims that must be present in every accepted token.
const REQUIRED_CLAIMS: [&str; 3] = ["exp", "aud", "iss"];

/// JWT validator backed by a [`KeySource`].
pub struct JwtValidator {
    /// Source of the published signing keys.
    key_source: Arc<dyn KeySource>,

    /// Expected `aud` value.
    audience: String,

    /// Expected `iss` value.
    issuer: String,

    /// Accepted signature algorithms.
    algorithms: Vec<Algorithm>,

    /// Tolerance for `iat` values in the future.
    clock_skew: Duration,
}

impl JwtValidator {
    /// Create a new JWT validator.
    ///
    /// # Arguments
    ///
    /// * `key_source` - Source of the issuer's public keys
    /// * `audience` - Audience the tokens must be issued for
    /// * `issuer` - Issuer the tokens must come from
    /// * `algorithms` - Accepted signature algorithms
    /// * `clock_skew` - Clock skew tolerance for iat validation
    pub fn new(
        key_source: Arc<dyn KeySource>,
        audience: String,
        issuer: String,
        algorithms: Vec<Algorithm>,
        clock_skew: Duration,
    ) -> Self {
        Self {
            key_source,
            audience,
            issuer,
            algorithms,
            clock_skew,
        }
    }

    /// Validate a token and return its claims.
    ///
    /// # Checks
    ///
    /// 1. Size and structure check, then `kid` extraction from the header
    /// 2. Key discovery
    /// 3. Key lookup by `kid`
    /// 4. Signature verification with the algorithms fitting the key type
    /// 5. `exp`, `nbf`, `aud`, `iss` validation
    /// 6. `iat` validation with clock skew tolerance
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] classifying the first failed check.
    #[instrument(skip_all, name = "drinks.auth.jwt.validate")]
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let start = Instant::now();
        let result = self.validate_inner(token).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.code(),
        };
        metrics::record_token_validation(outcome, start.elapsed());

        result
    }

    async fn validate_inner(&self, token: &str) -> Result<Claims, AuthError> {
        // 1. Extract kid from the unverified header (includes size check)
        let kid = extract_kid(token).map_err(|e| {
            tracing::debug!(target: "drinks.auth.jwt", error = %e, "Token kid extraction failed");
            match e {
                JwtValidationError::MissingKid => AuthError::MissingKeyId,
                _ => AuthError::UnparseableToken,
            }
        })?;

        // 2. Fetch the published key set
        let keys = self.key_source.key_set().await.map_err(|e| {
            tracing::warn!(target: "drinks.auth.jwt", error = %e, "Key discovery failed");
            AuthError::KeyDiscoveryFailed
        })?;

        // 3. Select the key
        let jwk = keys.get(&kid).ok_or_else(|| {
            tracing::debug!(target: "drinks.auth.jwt", kid = %kid, "No published key matches kid");
            AuthError::KeyNotFound
        })?;

        // 4-5. Verify signature and registered claims
        let claims = self.verify_token(token, jwk)?;

        // 6. Bound future iat with clock skew tolerance
        if let Some(iat) = claims.iat {
            if let Err(e) = validate_iat(iat, self.clock_skew) {
                tracing::debug!(target: "drinks.auth.jwt", error = %e, "Token iat validation failed");
                return Err(AuthError::InvalidClaims);
            }
        }

        tracing::debug!(target: "drinks.auth.jwt", "Token validated successfully");
        Ok(claims)
    }

    /// Verify the token signature against `jwk` and decode its claims.
    fn verify_token(&self, token: &str, jwk: &Jwk) -> Result<Claims, AuthError> {
        let decoding_key = decoding_key(jwk)?;

        let algorithms: Vec<Algorithm> = self
            .algorithms
            .iter()
            .copied()
            .filter(|alg| algorithm_fits_key_type(*alg, &jwk.kty))
            .collect();

        let Some(first) = algorithms.first().copied() else {
            tracing::warn!(
                target: "drinks.auth.jwt",
                kty = %jwk.kty,
                "No configured algorithm fits the key type"
            );
            return Err(AuthError::UnparseableToken);
        };

        let mut validation = Validation::new(first);
        validation.algorithms = algorithms;
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&REQUIRED_CLAIMS);

        // Decode to a raw map first so that a missing registered claim is
        // reported by claim validation rather than as a deserialization error.
        let token_data =
            decode::<serde_json::Value>(token, &decoding_key, &validation).map_err(|e| {
                tracing::debug!(target: "drinks.auth.jwt", error = %e, "Token verification failed");
                classify_jwt_error(&e)
            })?;

        serde_json::from_value(token_data.claims).map_err(|e| {
            tracing::debug!(target: "drinks.auth.jwt", error = %e, "Verified claims could not be decoded");
            AuthError::MalformedClaims
        })
    }
}

/// Build the public key for `jwk` from its published components.
fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    let result = match jwk.kty.as_str() {
        "RSA" => match (jwk.n.as_deref(), jwk.e.as_deref()) {
            (Some(n), Some(e)) => DecodingKey::from_rsa_components(n, e),
            _ => return Err(malformed_key(jwk, "RSA key missing n or e")),
        },
        "OKP" => match jwk.x.as_deref() {
            Some(x) => DecodingKey::from_ed_components(x),
            None => return Err(malformed_key(jwk, "OKP key missing x")),
        },
        "EC" => match (jwk.x.as_deref(), jwk.y.as_deref()) {
            (Some(x), Some(y)) => DecodingKey::from_ec_components(x, y),
            _ => return Err(malformed_key(jwk, "EC key missing x or y")),
        },
        _ => return Err(malformed_key(jwk, "Unsupported key type")),
    };

    result.map_err(|e| {
        tracing::warn!(target: "drinks.auth.jwt", kid = ?jwk.kid, error = %e, "Invalid public key encoding");
        AuthError::UnparseableToken
    })
}

fn malformed_key(jwk: &Jwk, reason: &'static str) -> AuthError {
    tracing::warn!(target: "drinks.auth.jwt", kid = ?jwk.kid, kty = %jwk.kty, reason, "Unusable JWK");
    AuthError::UnparseableToken
}

/// Whether `alg` verifies signatures made with a key of type `kty`.
fn algorithm_fits_key_type(alg: Algorithm, kty: &str) -> bool {
    match alg {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => kty == "RSA",
        Algorithm::EdDSA => kty == "OKP",
        Algorithm::ES256 | Algorithm::ES384 => kty == "EC",
        // Shared-secret algorithms never match a published public key
        _ => false,
    }
}

/// Fold a `jsonwebtoken` failure into the auth error taxonomy.
fn classify_jwt_error(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::ImmatureSignature
        | ErrorKind::InvalidSubject
        | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims,
        _ => AuthError::UnparseableToken,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::StaticKeySource;
    use drinks_test_utils::crypto_fixtures::TestRsaKey;
    use drinks_test_utils::token_builders::TestTokenBuilder;

    const AUDIENCE: &str = "drinks";
    const ISSUER: &str = "https://coffee-shop.auth0.com/";

    fn jwk_for(key: &TestRsaKey) -> Jwk {
        serde_json::from_value(key.public_jwk()).unwrap()
    }

    fn validator_with(keys: Vec<Jwk>, algorithms: Vec<Algorithm>) -> JwtValidator {
        JwtValidator::new(
            Arc::new(StaticKeySource::new(keys)),
            AUDIENCE.to_string(),
            ISSUER.to_string(),
            algorithms,
            common::jwt::DEFAULT_CLOCK_SKEW,
        )
    }

    fn validator() -> JwtValidator {
        let key = TestRsaKey::primary();
        validator_with(vec![jwk_for(&key)], vec![Algorithm::RS256])
    }

    fn builder() -> TestTokenBuilder {
        TestTokenBuilder::new()
            .issuer(ISSUER)
            .audience(AUDIENCE)
            .permissions(&["get:drinks-detail"])
    }

    #[tokio::test]
    async fn test_valid_token() {
        let token = builder().sign_rsa(&TestRsaKey::primary());

        let claims = validator().validate(&token).await.unwrap();

        assert_eq!(claims.iss, ISSUER);
        assert!(claims.aud.contains(AUDIENCE));
        assert!(claims.has_permission("get:drinks-detail"));
    }

    #[tokio::test]
    async fn test_same_token_twice_yields_identical_claims() {
        let token = builder().sign_rsa(&TestRsaKey::primary());
        let validator = validator();

        let first = validator.validate(&token).await.unwrap();
        let second = validator.validate(&token).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_expired_token() {
        let token = builder().expired().sign_rsa(&TestRsaKey::primary());

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[tokio::test]
    async fn test_wrong_audience() {
        let token = builder()
            .audience("someone-else")
            .sign_rsa(&TestRsaKey::primary());

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::InvalidClaims
        );
    }

    #[tokio::test]
    async fn test_wrong_issuer() {
        let token = builder()
            .issuer("https://evil.example.com/")
            .sign_rsa(&TestRsaKey::primary());

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::InvalidClaims
        );
    }

    #[tokio::test]
    async fn test_missing_audience_claim() {
        let token = builder().without_claim("aud").sign_rsa(&TestRsaKey::primary());

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::InvalidClaims
        );
    }

    #[tokio::test]
    async fn test_not_yet_valid_token() {
        let nbf = chrono::Utc::now().timestamp() + 3600;
        let token = builder()
            .claim("nbf", serde_json::json!(nbf))
            .sign_rsa(&TestRsaKey::primary());

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::InvalidClaims
        );
    }

    #[tokio::test]
    async fn test_iat_too_far_in_future() {
        let iat = chrono::Utc::now().timestamp() + 3600;
        let token = builder()
            .claim("iat", serde_json::json!(iat))
            .sign_rsa(&TestRsaKey::primary());

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::InvalidClaims
        );
    }

    #[tokio::test]
    async fn test_wrongly_typed_permissions_claim() {
        let token = builder()
            .claim("permissions", serde_json::json!("patch:drinks"))
            .sign_rsa(&TestRsaKey::primary());

        let err = validator().validate(&token).await.unwrap_err();

        assert_eq!(err, AuthError::MalformedClaims);
        assert_eq!(err.code(), "invalid_claims");
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_unrelated_claim_types_do_not_fail_validation() {
        let token = builder()
            .claim("scope", serde_json::json!(7))
            .claim("sub", serde_json::json!(12345))
            .sign_rsa(&TestRsaKey::primary());

        let claims = validator().validate(&token).await.unwrap();

        assert!(claims.sub.is_none());
        assert!(claims.has_permission("get:drinks-detail"));
    }

    #[tokio::test]
    async fn test_key_without_kid_is_skipped() {
        let primary = TestRsaKey::primary();
        let mut anonymous = TestRsaKey::secondary().public_jwk();
        anonymous.as_object_mut().unwrap().remove("kid");
        let validator = validator_with(
            vec![serde_json::from_value(anonymous).unwrap(), jwk_for(&primary)],
            vec![Algorithm::RS256],
        );

        let token = builder().sign_rsa(&primary);

        assert!(validator.validate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_kid() {
        let token = builder().kid("rotated-away").sign_rsa(&TestRsaKey::primary());

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::KeyNotFound
        );
    }

    #[tokio::test]
    async fn test_missing_kid() {
        let token = builder().without_kid().sign_rsa(&TestRsaKey::primary());

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::MissingKeyId
        );
    }

    #[tokio::test]
    async fn test_garbage_token() {
        for token in ["", "abc", "a.b", "!!!.payload.sig", "a.b.c.d"] {
            assert_eq!(
                validator().validate(token).await.unwrap_err(),
                AuthError::UnparseableToken,
                "token {token:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_signature_from_other_key_under_known_kid() {
        // Signed with the secondary key but claiming the primary key's kid
        let primary = TestRsaKey::primary();
        let token = builder()
            .kid(&primary.kid)
            .sign_rsa(&TestRsaKey::secondary());

        assert_eq!(
            validator().validate(&token).await.unwrap_err(),
            AuthError::UnparseableToken
        );
    }

    #[tokio::test]
    async fn test_algorithm_not_configured() {
        let key = TestRsaKey::primary();
        let validator = validator_with(vec![jwk_for(&key)], vec![Algorithm::RS512]);
        let token = builder().sign_rsa(&key);

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthError::UnparseableToken
        );
    }

    #[tokio::test]
    async fn test_no_algorithm_fits_key_type() {
        let key = TestRsaKey::primary();
        let validator = validator_with(vec![jwk_for(&key)], vec![Algorithm::EdDSA]);
        let token = builder().sign_rsa(&key);

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthError::UnparseableToken
        );
    }

    #[tokio::test]
    async fn test_selects_key_by_kid_among_several() {
        let primary = TestRsaKey::primary();
        let secondary = TestRsaKey::secondary();
        let validator = validator_with(
            vec![jwk_for(&primary), jwk_for(&secondary)],
            vec![Algorithm::RS256],
        );

        let token = builder().sign_rsa(&secondary);
        assert!(validator.validate(&token).await.is_ok());

        let token = builder().sign_rsa(&primary);
        assert!(validator.validate(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_key_discovery_failure() {
        struct FailingKeySource;

        #[async_trait::async_trait]
        impl KeySource for FailingKeySource {
            async fn key_set(
                &self,
            ) -> Result<crate::auth::jwks::KeySet, crate::auth::jwks::KeyDiscoveryError> {
                Err(crate::auth::jwks::KeyDiscoveryError::Status(500))
            }
        }

        let validator = JwtValidator::new(
            Arc::new(FailingKeySource),
            AUDIENCE.to_string(),
            ISSUER.to_string(),
            vec![Algorithm::RS256],
            common::jwt::DEFAULT_CLOCK_SKEW,
        );
        let token = builder().sign_rsa(&TestRsaKey::primary());

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            AuthError::KeyDiscoveryFailed
        );
    }

    #[test]
    fn test_decoding_key_rejects_incomplete_jwks() {
        let jwk: Jwk = serde_json::from_value(serde_json::json!({
            "kty": "RSA", "kid": "k", "n": "AQAB"
        }))
        .unwrap();
        assert!(matches!(decoding_key(&jwk), Err(AuthError::UnparseableToken)));

        let jwk: Jwk =
            serde_json::from_value(serde_json::json!({"kty": "oct", "kid": "k"})).unwrap();
        assert!(matches!(decoding_key(&jwk), Err(AuthError::UnparseableToken)));
    }

    #[test]
    fn test_algorithm_fits_key_type() {
        assert!(algorithm_fits_key_type(Algorithm::RS256, "RSA"));
        assert!(algorithm_fits_key_type(Algorithm::PS512, "RSA"));
        assert!(algorithm_fits_key_type(Algorithm::EdDSA, "OKP"));
        assert!(algorithm_fits_key_type(Algorithm::ES256, "EC"));
        assert!(!algorithm_fits_key_type(Algorithm::RS256, "OKP"));
        assert!(!algorithm_fits_key_type(Algorithm::HS256, "RSA"));
        assert!(!algorithm_fits_key_type(Algorithm::HS256, "oct"));
    }

    #[test]
    fn test_classify_jwt_error() {
        use jsonwebtoken::errors::Error;

        assert_eq!(
            classify_jwt_error(&Error::from(ErrorKind::ExpiredSignature)),
            AuthError::TokenExpired
        );
        assert_eq!(
            classify_jwt_error(&Error::from(ErrorKind::InvalidIssuer)),
            AuthError::InvalidClaims
        );
        assert_eq!(
            classify_jwt_error(&Error::from(ErrorKind::MissingRequiredClaim("iss".into()))),
            AuthError::InvalidClaims
        );
        assert_eq!(
            classify_jwt_error(&Error::from(ErrorKind::InvalidSignature)),
            AuthError::UnparseableToken
        );
        assert_eq!(
            classify_jwt_error(&Error::from(ErrorKind::InvalidAlgorithm)),
            AuthError::UnparseableToken
        );
    }
}
