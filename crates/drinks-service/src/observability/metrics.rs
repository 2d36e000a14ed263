//! Metrics definitions for the drinks service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `drinks_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: a handful of values (ids are replaced by `{id}`)
//! - `status`: success, error, timeout
//! - `outcome`: the fixed set of auth error codes plus `success`
//! - `operation`: bounded by repository code

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle used to
/// render `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("drinks_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("drinks_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        // JWKS fetches go over the network to the identity provider
        .set_buckets_for_metric(
            Matcher::Prefix("drinks_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("drinks_token_validation".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set token validation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `drinks_http_requests_total`, `drinks_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Captures every response, including framework-level rejections such as
/// 404, 405, 415 and 422.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("drinks_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("drinks_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to bound label cardinality.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/health" | "/metrics" | "/drinks" | "/drinks-detail" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

/// Replace the drink id in `/drinks/{id}` with a placeholder.
fn normalize_dynamic_endpoint(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/drinks/") {
        if !rest.is_empty() && !rest.contains('/') {
            return "/drinks/{id}".to_string();
        }
    }

    // Unknown paths normalized to "/other" to bound cardinality
    "/other".to_string()
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record the outcome of one token validation.
///
/// Metric: `drinks_token_validations_total`, `drinks_token_validation_duration_seconds`
/// Labels: `outcome` (`success` or an auth error code)
pub fn record_token_validation(outcome: &str, duration: Duration) {
    histogram!("drinks_token_validation_duration_seconds",
        "outcome" => outcome.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("drinks_token_validations_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a JWKS fetch against the discovery endpoint.
///
/// Metric: `drinks_jwks_fetches_total`, `drinks_jwks_fetch_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("drinks_jwks_fetch_duration_seconds").record(duration.as_secs_f64());

    counter!("drinks_jwks_fetches_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution.
///
/// Metric: `drinks_db_query_duration_seconds`, `drinks_db_queries_total`
/// Labels: `operation`, `status`
///
/// Operations: list_drinks, get_drink, insert_drink, update_drink,
///             delete_drink, ping
pub fn record_db_query(operation: &str, status: &str, duration: Duration) {
    histogram!("drinks_db_query_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("drinks_db_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Tests
// ============================================================================
