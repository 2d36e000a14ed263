//! Test server harness for E2E testing
//!
//! Provides `TestDrinksServer` for spawning real drinks service instances in
//! tests, backed by the in-memory repository and a mock key set endpoint.

use crate::crypto_fixtures::{TestEd25519Key, TestRsaKey};
use crate::jwks_mock::MockJwksServer;
use crate::token_builders::TestTokenBuilder;
use drinks_service::auth::TokenGate;
use drinks_service::config::Config;
use drinks_service::models::NewDrink;
use drinks_service::observability::metrics::init_metrics_recorder;
use drinks_service::repositories::InMemoryDrinkRepository;
use drinks_service::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Audience every test server expects.
pub const TEST_AUDIENCE: &str = "drinks";

/// Seed of the Ed25519 key published next to the RSA key.
pub const TEST_ED25519_SEED: u8 = 1;

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the drinks service in E2E tests.
///
/// The key set endpoint publishes [`TestRsaKey::primary`] and the Ed25519
/// key derived from [`TEST_ED25519_SEED`]; RS256 and EdDSA are accepted.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_menu_is_public() -> Result<()> {
///     let server = TestDrinksServer::spawn().await?;
///
///     let response = reqwest::get(format!("{}/drinks", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestDrinksServer {
    addr: SocketAddr,
    config: Config,
    jwks: MockJwksServer,
    _handle: JoinHandle<()>,
}

impl TestDrinksServer {
    /// Spawn a server with an empty menu.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(Vec::new(), &[]).await
    }

    /// Spawn a server whose menu starts with `drinks`.
    pub async fn spawn_with_drinks(drinks: Vec<NewDrink>) -> Result<Self, anyhow::Error> {
        Self::spawn_with(drinks, &[]).await
    }

    /// Spawn a server with a seeded menu and extra environment overrides.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Discover keys from its own mock JWKS server
    /// - Start the HTTP server in the background
    pub async fn spawn_with(
        drinks: Vec<NewDrink>,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let ed25519 = TestEd25519Key::from_seed(TEST_ED25519_SEED)
            .map_err(|e| anyhow::anyhow!("Failed to build Ed25519 fixture: {}", e))?;
        let jwks =
            MockJwksServer::start(&[TestRsaKey::primary().public_jwk(), ed25519.public_jwk()])
                .await;

        // The mock server doubles as the identity provider domain
        let mut vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("AUTH0_DOMAIN".to_string(), jwks.uri()),
            ("AUTH0_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("AUTH0_ALGORITHMS".to_string(), "RS256,EdDSA".to_string()),
        ]);
        for (name, value) in overrides {
            vars.insert((*name).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState {
            repo: Arc::new(InMemoryDrinkRepository::with_drinks(drinks)),
            gate: Arc::new(TokenGate::from_config(&config)),
            config: config.clone(),
        });

        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            jwks,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The mock key set endpoint the server discovers keys from.
    pub fn jwks(&self) -> &MockJwksServer {
        &self.jwks
    }

    /// Token builder preset with the issuer and audience this server expects.
    pub fn token(&self) -> TestTokenBuilder {
        TestTokenBuilder::new()
            .issuer(&self.config.auth0_issuer)
            .audience(&self.config.auth0_audience)
    }

    /// `Authorization` header value for an RS256 token granting `permissions`.
    pub fn bearer(&self, permissions: &[&str]) -> String {
        let token = self
            .token()
            .permissions(permissions)
            .sign_rsa(&TestRsaKey::primary());
        format!("Bearer {token}")
    }
}

impl Drop for TestDrinksServer {
    fn drop(&mut self) {
        // Abort the HTTP server task when the test completes.
        self._handle.abort();
    }
}
