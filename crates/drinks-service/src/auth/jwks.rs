//! Key discovery: fetching the published signing keys of the token issuer.
//!
//! The issuer publishes its active public keys as a JSON Web Key Set at a
//! well-known URL (`<domain>/.well-known/jwks.json`). The [`KeySource`] trait
//! is the seam the validator depends on; [`JwksClient`] is the HTTP
//! implementation and [`StaticKeySource`] serves a fixed key set.
//!
//! # Caching
//!
//! By default the key set is fetched again for every verification. A cache
//! TTL can be configured to keep a fetched key set for a bounded time; key
//! rotations are then picked up once the entry expires.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::observability::metrics;

/// HTTP timeout for a single JWKS fetch.
const JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// JSON Web Key as published in the key set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA", "OKP" or "EC").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    ///
    /// Optional in a key set; a key without one is never selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// Algorithm the key is intended for, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Curve name for OKP/EC keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// OKP public key, or EC x coordinate (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

/// JWKS document as served by the discovery endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Published keys indexed by key ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: HashMap<String, Jwk>,
}

impl KeySet {
    /// Look up a key by its identifier.
    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.keys.get(kid)
    }

    /// Number of distinct key identifiers.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl From<Vec<Jwk>> for KeySet {
    /// Builds the index in document order; when a `kid` repeats, the last
    /// entry wins. Keys without a `kid` are left out.
    fn from(keys: Vec<Jwk>) -> Self {
        Self {
            keys: keys
                .into_iter()
                .filter_map(|key| Some((key.kid.clone()?, key)))
                .collect(),
        }
    }
}

impl From<JwksResponse> for KeySet {
    fn from(response: JwksResponse) -> Self {
        Self::from(response.keys)
    }
}

/// Failure to obtain the key set.
#[derive(Debug, Clone, Error)]
pub enum KeyDiscoveryError {
    #[error("JWKS request failed: {0}")]
    Request(String),

    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    #[error("JWKS response could not be parsed: {0}")]
    Parse(String),
}

/// Source of the currently published signing keys.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Return the current key set.
    async fn key_set(&self) -> Result<KeySet, KeyDiscoveryError>;
}

/// Cached key set with expiry time.
struct CachedKeySet {
    keys: KeySet,
    expires_at: Instant,
}

/// HTTP JWKS client.
///
/// Without a TTL every call performs a fresh GET. With a TTL the fetched key
/// set is shared across requests until it expires.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached key set, only used when `cache_ttl` is set.
    cache: Arc<RwLock<Option<CachedKeySet>>>,

    /// Cache TTL; `None` disables caching.
    cache_ttl: Option<Duration>,
}

impl JwksClient {
    /// Create a JWKS client that fetches on every call.
    pub fn new(jwks_url: String) -> Self {
        Self::with_cache_ttl(jwks_url, None)
    }

    /// Create a JWKS client with an optional cache TTL.
    ///
    /// A zero TTL is treated as no caching.
    pub fn with_cache_ttl(jwks_url: String, cache_ttl: Option<Duration>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(JWKS_FETCH_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "drinks.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl: cache_ttl.filter(|ttl| !ttl.is_zero()),
        }
    }

    /// Fetch and parse the key set from the discovery endpoint.
    #[instrument(skip(self), name = "drinks.auth.jwks.fetch")]
    async fn fetch(&self) -> Result<KeySet, KeyDiscoveryError> {
        let start = Instant::now();
        let result = self.fetch_inner().await;
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_jwks_fetch(status, start.elapsed());
        result
    }

    async fn fetch_inner(&self) -> Result<KeySet, KeyDiscoveryError> {
        tracing::debug!(target: "drinks.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "drinks.auth.jwks", error = %e, "Failed to fetch JWKS");
                KeyDiscoveryError::Request(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "drinks.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(KeyDiscoveryError::Status(response.status().as_u16()));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "drinks.auth.jwks", error = %e, "Failed to parse JWKS response");
            KeyDiscoveryError::Parse(e.to_string())
        })?;

        let keys = KeySet::from(jwks);
        tracing::debug!(target: "drinks.auth.jwks", key_count = keys.len(), "JWKS fetched");
        Ok(keys)
    }
}

#[async_trait]
impl KeySource for JwksClient {
    async fn key_set(&self) -> Result<KeySet, KeyDiscoveryError> {
        let Some(ttl) = self.cache_ttl else {
            return self.fetch().await;
        };

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    tracing::debug!(target: "drinks.auth.jwks", "JWKS cache hit");
                    return Ok(cached.keys.clone());
                }
            }
        }

        let keys = self.fetch().await?;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeySet {
            keys: keys.clone(),
            expires_at: Instant::now() + ttl,
        });
        tracing::info!(target: "drinks.auth.jwks", key_count = keys.len(), "JWKS cache refreshed");

        Ok(keys)
    }
}

/// Fixed key set, for deployments with pinned keys and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticKeySource {
    keys: KeySet,
}

impl StaticKeySource {
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self {
            keys: KeySet::from(keys),
        }
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn key_set(&self) -> Result<KeySet, KeyDiscoveryError> {
        Ok(self.keys.clone())
    }
}
