//! Drinks service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl and are
//! rendered as
//!
//! ```json
//! {"success": false, "error": 404, "code": "not_found", "message": "..."}
//! ```
//!
//! Database and internal failures return a generic message to clients; the
//! actual error is logged server-side.

use crate::auth::AuthError;
use axum::{
    extract::rejection::JsonRejection,
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Drinks service error type.
///
/// Maps to HTTP status codes:
/// - Auth: 400, 401 or 403 depending on the failure
/// - BadRequest: 400 Bad Request
/// - NotFound: 404 Not Found
/// - Conflict: 409 Conflict
/// - Unprocessable: 422 Unprocessable Entity
/// - Database, Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum DrinksError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error")]
    Internal,
}

impl DrinksError {
    /// Not-found error for a drink id.
    pub fn drink_not_found(id: i64) -> Self {
        DrinksError::NotFound(format!("Drink with id={id} not found"))
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            DrinksError::Auth(err) => err.status_code(),
            DrinksError::BadRequest(_) => 400,
            DrinksError::NotFound(_) => 404,
            DrinksError::Conflict(_) => 409,
            DrinksError::Unprocessable(_) => 422,
            DrinksError::Database(_) | DrinksError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: u16,
    code: &'static str,
    message: String,
}

impl IntoResponse for DrinksError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let (code, message) = match &self {
            DrinksError::Auth(err) => (err.code(), err.description()),
            DrinksError::BadRequest(reason) => ("bad_request", reason.clone()),
            DrinksError::NotFound(resource) => ("not_found", resource.clone()),
            DrinksError::Conflict(reason) => ("conflict", reason.clone()),
            DrinksError::Unprocessable(reason) => ("unprocessable", reason.clone()),
            DrinksError::Database(err) => {
                tracing::error!(target: "drinks.database", error = %err, "Database operation failed");
                (
                    "database_error",
                    "An internal database error occurred".to_string(),
                )
            }
            DrinksError::Internal => ("internal_error", "An internal error occurred".to_string()),
        };

        let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            code,
            message,
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            let challenge = match &self {
                DrinksError::Auth(AuthError::HeaderMissing) => "Bearer realm=\"drinks\"",
                DrinksError::Auth(AuthError::TokenExpired) => {
                    "Bearer realm=\"drinks\", error=\"invalid_token\", error_description=\"Token expired.\""
                }
                _ => "Bearer realm=\"drinks\", error=\"invalid_token\"",
            };
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }

        response
    }
}

/// Convert sqlx errors to DrinksError
impl From<sqlx::Error> for DrinksError {
    fn from(err: sqlx::Error) -> Self {
        DrinksError::Database(err.to_string())
    }
}

/// Malformed or schema-violating JSON bodies are unprocessable.
impl From<JsonRejection> for DrinksError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(target: "drinks.handlers", error = %rejection.body_text(), "Request body rejected");
        DrinksError::Unprocessable(rejection.body_text())
    }
}
