//! Drinks service configuration.
//!
//! Configuration is loaded from environment variables once at startup and is
//! immutable afterwards. The database URL is redacted in Debug output.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default accepted token signature algorithms.
pub const DEFAULT_ALGORITHMS: &str = "RS256";

/// Path of the key set document relative to the identity provider domain.
const JWKS_PATH: &str = ".well-known/jwks.json";

/// Drinks service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Identity provider base URL, always ending in `/`.
    pub auth0_domain: String,

    /// Expected `aud` claim.
    pub auth0_audience: String,

    /// Expected `iss` claim (default: the domain).
    pub auth0_issuer: String,

    /// Key set discovery URL (default: `<domain>.well-known/jwks.json`).
    pub jwks_url: String,

    /// Accepted token signature algorithms.
    pub jwt_algorithms: Vec<Algorithm>,

    /// Key set cache TTL in seconds; 0 fetches on every verification.
    pub jwks_cache_ttl_seconds: u64,

    /// JWT clock skew tolerance in seconds for `iat` validation.
    pub jwt_clock_skew_seconds: u64,

    /// Seconds to keep serving in-flight requests after a shutdown signal.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("auth0_domain", &self.auth0_domain)
            .field("auth0_audience", &self.auth0_audience)
            .field("auth0_issuer", &self.auth0_issuer)
            .field("jwks_url", &self.jwks_url)
            .field("jwt_algorithms", &self.jwt_algorithms)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWT algorithm configuration: {0}")]
    InvalidAlgorithms(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = required(vars, "DATABASE_URL")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let mut auth0_domain = required(vars, "AUTH0_DOMAIN")?;
        if !auth0_domain.ends_with('/') {
            auth0_domain.push('/');
        }

        let auth0_audience = required(vars, "AUTH0_AUDIENCE")?;

        let auth0_issuer = vars
            .get("AUTH0_ISSUER")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| auth0_domain.clone());

        let jwks_url = vars
            .get("AUTH0_JWKS_URL")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("{auth0_domain}{JWKS_PATH}"));

        let jwt_algorithms = parse_algorithms(
            vars.get("AUTH0_ALGORITHMS")
                .map_or(DEFAULT_ALGORITHMS, String::as_str),
        )?;

        let jwks_cache_ttl_seconds = parse_u64(vars, "JWKS_CACHE_TTL_SECONDS", 0)?;

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            let value = value.unsigned_abs();
            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs()
        };

        let drain_seconds = parse_u64(vars, "DRINKS_DRAIN_SECONDS", 0)?;

        Ok(Config {
            database_url,
            bind_address,
            auth0_domain,
            auth0_audience,
            auth0_issuer,
            jwks_url,
            jwt_algorithms,
            jwks_cache_ttl_seconds,
            jwt_clock_skew_seconds,
            drain_seconds,
        })
    }

    /// Key set cache TTL, `None` when caching is disabled.
    pub fn jwks_cache_ttl(&self) -> Option<Duration> {
        (self.jwks_cache_ttl_seconds > 0).then(|| Duration::from_secs(self.jwks_cache_ttl_seconds))
    }

    /// Clock skew tolerance for `iat` validation.
    pub fn jwt_clock_skew(&self) -> Duration {
        Duration::from_secs(self.jwt_clock_skew_seconds)
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_u64(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value_str) => value_str
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                reason: format!("must be a non-negative integer, got '{value_str}': {e}"),
            }),
        None => Ok(default),
    }
}

/// Parse a comma-separated algorithm list such as `RS256,PS256`.
fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();

    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let alg = Algorithm::from_str(name).map_err(|_| {
            ConfigError::InvalidAlgorithms(format!("unknown algorithm '{name}'"))
        })?;

        if matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ConfigError::InvalidAlgorithms(format!(
                "shared-secret algorithm '{name}' cannot verify published keys"
            )));
        }

        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }

    if algorithms.is_empty() {
        return Err(ConfigError::InvalidAlgorithms(
            "AUTH0_ALGORITHMS must name at least one algorithm".to_string(),
        ));
    }

    Ok(algorithms)
}
