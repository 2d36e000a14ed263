//! Token authorization gate.
//!
//! Composes credential extraction, token verification and the permission
//! check into one pipeline that stops at the first failure.

use crate::auth::claims::Claims;
use crate::auth::error::AuthError;
use crate::auth::jwks::JwksClient;
use crate::auth::jwt::JwtValidator;
use crate::auth::permissions::check_permission;
use crate::config::Config;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

/// Authorization gate shared by every protected route.
pub struct TokenGate {
    validator: JwtValidator,
}

impl TokenGate {
    pub fn new(validator: JwtValidator) -> Self {
        Self { validator }
    }

    /// Build the gate for the configured identity provider, discovering
    /// keys from its key set URL.
    pub fn from_config(config: &Config) -> Self {
        let key_source = Arc::new(JwksClient::with_cache_ttl(
            config.jwks_url.clone(),
            config.jwks_cache_ttl(),
        ));

        Self::new(JwtValidator::new(
            key_source,
            config.auth0_audience.clone(),
            config.auth0_issuer.clone(),
            config.jwt_algorithms.clone(),
            config.jwt_clock_skew(),
        ))
    }

    /// Extract the bearer token from the `Authorization` header.
    ///
    /// The header value is split on whitespace and must be exactly
    /// `Bearer <token>`, with the scheme matched case-insensitively.
    ///
    /// # Errors
    ///
    /// - `HeaderMissing` - no `Authorization` header
    /// - `SchemeNotBearer` - empty or non-UTF-8 value, or a scheme other than `Bearer`
    /// - `TokenNotFound` - `Bearer` with nothing after it
    /// - `NotBearerToken` - more than two parts
    pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
        let value = headers.get(AUTHORIZATION).ok_or(AuthError::HeaderMissing)?;
        let value = value.to_str().map_err(|_| AuthError::SchemeNotBearer)?;

        let mut parts = value.split_whitespace();

        match parts.next() {
            Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {}
            _ => return Err(AuthError::SchemeNotBearer),
        }

        let token = parts.next().ok_or(AuthError::TokenNotFound)?;

        if parts.next().is_some() {
            return Err(AuthError::NotBearerToken);
        }

        Ok(token)
    }

    /// Run the full pipeline: extract, verify, then check `permission`.
    ///
    /// # Errors
    ///
    /// Returns the classification of the first stage that fails.
    #[instrument(skip_all, name = "drinks.auth.authorize", fields(permission = permission.unwrap_or("none")))]
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        permission: Option<&str>,
    ) -> Result<Claims, AuthError> {
        let token = Self::extract_bearer_token(headers).map_err(|e| {
            tracing::debug!(target: "drinks.auth.gate", code = e.code(), "Credential extraction failed");
            e
        })?;

        let claims = self.validator.validate(token).await?;
        check_permission(&claims, permission)?;

        Ok(claims)
    }

    /// Authorize the request and, on success only, run `op` with the
    /// verified claims.
    ///
    /// # Errors
    ///
    /// Returns the authorization failure; `op` is not invoked in that case.
    pub async fn protect<F, Fut, T>(
        &self,
        headers: &HeaderMap,
        permission: Option<&str>,
        op: F,
    ) -> Result<T, AuthError>
    where
        F: FnOnce(Claims) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.authorize(headers, permission).await?;
        Ok(op(claims).await)
    }
}
