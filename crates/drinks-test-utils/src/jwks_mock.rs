//! Mock identity provider key set endpoint.
//!
//! Serves a JWKS document at `/.well-known/jwks.json` from a wiremock server
//! and lets tests swap the published keys or make discovery fail.

use crate::crypto_fixtures::jwks_document;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the key set is published under.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Wiremock-backed JWKS endpoint.
pub struct MockJwksServer {
    server: MockServer,
}

impl MockJwksServer {
    /// Start a server publishing `keys`.
    pub async fn start(keys: &[serde_json::Value]) -> Self {
        let server = MockServer::start().await;
        let mock = Self { server };
        mock.publish(keys).await;
        mock
    }

    /// Base URL of the mock server, without a trailing slash.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Full key set URL.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Replace the published key set.
    pub async fn publish(&self, keys: &[serde_json::Value]) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
            .mount(&self.server)
            .await;
    }

    /// Make the endpoint answer with `status` and no key set.
    pub async fn fail_with(&self, status: u16) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Make the endpoint answer 200 with a body that is not a key set.
    pub async fn serve_garbage(&self) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&self.server)
            .await;
    }

    /// Number of key set requests received since the last reset.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}
