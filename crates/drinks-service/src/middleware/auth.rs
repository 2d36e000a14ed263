//! Authorization middleware for protected routes.
//!
//! Runs the token gate for the route's required permission and injects the
//! verified claims into request extensions. Any auth failure is rendered once,
//! here, through [`DrinksError`].

use crate::auth::{Permission, TokenGate};
use crate::errors::DrinksError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authorization middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Gate shared by all protected routes.
    pub gate: Arc<TokenGate>,

    /// Permission the route requires, if any.
    pub permission: Option<Permission>,
}

impl AuthState {
    pub fn new(gate: Arc<TokenGate>, permission: Option<Permission>) -> Arc<Self> {
        Arc::new(Self { gate, permission })
    }
}

/// Middleware that authorizes the request before the handler runs.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - 400/401/403 JSON error if the credential is missing, invalid or lacks the permission
/// - Continues to next handler with `Claims` in extensions otherwise
#[instrument(skip_all, name = "drinks.middleware.auth", fields(method = %req.method(), path = %req.uri().path()))]
pub async fn require_permission(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, DrinksError> {
    let permission = state.permission.map(Permission::as_str);

    let claims = state
        .gate
        .authorize(req.headers(), permission)
        .await
        .map_err(|e| {
            tracing::debug!(
                target: "drinks.middleware.auth",
                code = e.code(),
                status = e.status_code(),
                "Request rejected"
            );
            DrinksError::from(e)
        })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
