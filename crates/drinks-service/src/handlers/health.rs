//! Health check handler.

use crate::errors::DrinksError;
use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Health check handler.
///
/// Pings the repository and reports the service status. An unreachable
/// database yields an "unhealthy" body rather than an error so that probes
/// always see the response.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "healthy"
/// }
/// ```
#[instrument(skip_all, name = "drinks.health.check")]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, DrinksError> {
    let status = match state.repo.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!(target: "drinks.health", error = %e, "Database ping failed");
            "unhealthy"
        }
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        database: status.to_string(),
    }))
}
