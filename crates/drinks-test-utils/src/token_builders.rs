//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating signed bearer tokens.

use crate::crypto_fixtures::{TestEd25519Key, TestRsaKey};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Header `kid` handling.
#[derive(Debug, Clone)]
enum KidChoice {
    /// Use the signing key's own kid.
    FromKey,
    Explicit(String),
    Omitted,
}

/// Builder for creating signed test tokens
///
/// Defaults: `sub` set, `iat` now, `exp` one hour from now, no `iss`,
/// `aud` or `permissions`.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .issuer("https://coffee-shop.auth0.com/")
///     .audience("drinks")
///     .permissions(&["get:drinks-detail"])
///     .sign_rsa(&TestRsaKey::primary());
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
    kid: KidChoice,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("auth0|barista"));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );

        Self {
            claims,
            kid: KidChoice::FromKey,
        }
    }

    /// Set the subject
    pub fn subject(self, subject: &str) -> Self {
        self.claim("sub", json!(subject))
    }

    /// Set the issuer
    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", json!(issuer))
    }

    /// Set a single audience
    pub fn audience(self, audience: &str) -> Self {
        self.claim("aud", json!(audience))
    }

    /// Set the `permissions` array
    pub fn permissions(self, permissions: &[&str]) -> Self {
        self.claim("permissions", json!(permissions))
    }

    /// Set the scope (space-separated)
    pub fn scope(self, scope: &str) -> Self {
        self.claim("scope", json!(scope))
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.claim("exp", json!(exp))
    }

    /// Expire the token well outside any leeway
    pub fn expired(self) -> Self {
        self.expires_in(-600)
    }

    /// Set an arbitrary claim
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim, including the defaults
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Put `kid` in the header instead of the signing key's kid
    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = KidChoice::Explicit(kid.to_string());
        self
    }

    /// Leave `kid` out of the header
    pub fn without_kid(mut self) -> Self {
        self.kid = KidChoice::Omitted;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with RS256 using `key`
    pub fn sign_rsa(&self, key: &TestRsaKey) -> String {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_pem.as_bytes())
            .expect("fixture RSA key should parse");
        self.sign(Algorithm::RS256, &key.kid, &encoding_key)
    }

    /// Sign with EdDSA using `key`
    pub fn sign_ed25519(&self, key: &TestEd25519Key) -> String {
        let encoding_key = EncodingKey::from_ed_der(&key.private_pkcs8);
        self.sign(Algorithm::EdDSA, &key.kid, &encoding_key)
    }

    /// Sign with HS256 using a shared secret, naming `kid` in the header
    ///
    /// Used to check that symmetric tokens are refused even when they claim
    /// the id of a published asymmetric key.
    pub fn sign_hs256(&self, kid: &str, secret: &[u8]) -> String {
        self.sign(Algorithm::HS256, kid, &EncodingKey::from_secret(secret))
    }

    fn sign(&self, algorithm: Algorithm, key_kid: &str, encoding_key: &EncodingKey) -> String {
        let mut header = Header::new(algorithm);
        header.kid = match &self.kid {
            KidChoice::FromKey => Some(key_kid.to_string()),
            KidChoice::Explicit(kid) => Some(kid.clone()),
            KidChoice::Omitted => None,
        };

        encode(&header, &self.build(), encoding_key).expect("test token should sign")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
