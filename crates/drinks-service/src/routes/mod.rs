//! HTTP routes for the drinks service.
//!
//! Defines the Axum router and application state.

use crate::auth::{Permission, TokenGate};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_permission, AuthState};
use crate::repositories::DrinkRepository;
use axum::{
    middleware,
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Drink storage.
    pub repo: Arc<dyn DrinkRepository>,

    /// Authorization gate for protected routes.
    pub gate: Arc<TokenGate>,

    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `GET /drinks` - Public menu
/// - `GET /health` - Health check (database ping)
/// - `GET /metrics` - Prometheus metrics endpoint
/// - `GET /drinks-detail` - Requires `get:drinks-detail`
/// - `POST /drinks` - Requires `post:drinks`
/// - `PATCH /drinks/:id` - Requires `patch:drinks`
/// - `DELETE /drinks/:id` - Requires `delete:drinks`
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let gate = Arc::clone(&state.gate);

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/drinks", get(handlers::list_drinks))
        .route("/health", get(handlers::health_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes, each guarded by its own permission
    let protected_routes = Router::new()
        .route(
            "/drinks-detail",
            guarded(
                get(handlers::list_drinks_detail),
                &gate,
                Permission::GetDrinksDetail,
            ),
        )
        .route(
            "/drinks",
            guarded(post(handlers::create_drink), &gate, Permission::PostDrinks),
        )
        .route(
            "/drinks/:id",
            guarded(patch(handlers::update_drink), &gate, Permission::PatchDrinks).merge(
                guarded(delete(handlers::delete_drink), &gate, Permission::DeleteDrinks),
            ),
        )
        .with_state(state);

    // Merge routes and apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Put `route` behind the token gate, requiring `permission`.
///
/// Only the matched method is guarded; method mismatches still fall through
/// to the router's 405 handling.
fn guarded(
    route: MethodRouter<Arc<AppState>>,
    gate: &Arc<TokenGate>,
    permission: Permission,
) -> MethodRouter<Arc<AppState>> {
    route.route_layer(middleware::from_fn_with_state(
        AuthState::new(Arc::clone(gate), Some(permission)),
        require_permission,
    ))
}
