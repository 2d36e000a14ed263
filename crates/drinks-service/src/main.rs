//! Drinks Service
//!
//! Entry point for the coffee shop drink menu API.

use drinks_service::auth::TokenGate;
use drinks_service::config::Config;
use drinks_service::observability::metrics::init_metrics_recorder;
use drinks_service::repositories::PgDrinkRepository;
use drinks_service::routes::{self, AppState};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Per-statement timeout applied to every pooled connection.
const STATEMENT_TIMEOUT_SECONDS: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!(version = env!("CARGO_PKG_VERSION"), "Drinks Service starting");

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Metrics recorder setup failed");
        e
    })?;

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Configuration rejected");
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        issuer = %config.auth0_issuer,
        audience = %config.auth0_audience,
        jwks_url = %config.jwks_url,
        jwks_cache_ttl_seconds = config.jwks_cache_ttl_seconds,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded"
    );

    let db_pool = connect_database(&config.database_url).await.map_err(|e| {
        error!(error = %e, "Database connection failed");
        e
    })?;

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!(error = %e, bind_address = %config.bind_address, "Invalid bind address");
        e
    })?;
    let drain_seconds = config.drain_seconds;

    let state = Arc::new(AppState {
        repo: Arc::new(PgDrinkRepository::new(db_pool)),
        gate: Arc::new(TokenGate::from_config(&config)),
        config,
    });
    let app = routes::build_routes(state, metrics_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Drinks Service listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain_seconds))
    .await?;

    info!("Drinks Service stopped");

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drinks_service=debug,drinks=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Open the bounded connection pool; every session gets a statement timeout.
async fn connect_database(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&add_query_timeout(database_url, STATEMENT_TIMEOUT_SECONDS))
        .await?;

    info!(target: "drinks.database", "Database connection pool ready");

    Ok(pool)
}

/// Resolves once SIGINT or SIGTERM arrives and `drain_secs` have passed.
async fn shutdown_signal(drain_secs: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!(signal = "SIGINT", "Shutdown requested"),
            Err(e) => error!(error = %e, "Cannot listen for SIGINT"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!(signal = "SIGTERM", "Shutdown requested");
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_secs == 0 {
        return;
    }

    warn!(drain_secs, "Draining in-flight requests");
    tokio::time::sleep(Duration::from_secs(drain_secs)).await;
}

/// Appends a statement_timeout to the database URL so queries cannot hang.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}options=-c%20statement_timeout%3D{}s",
        url, separator, timeout_secs
    )
}
