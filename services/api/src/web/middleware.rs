//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use kayak_rental_core::domain::{Capability, Role};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::Rejection;
use crate::web::state::AppState;

/// The caller of a protected route, resolved from the session cookie.
/// Handlers receive it as an explicit `Extension` rather than reading any
/// ambient state.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// Rejects with 403 unless the caller's role grants `capability`.
    pub fn ensure(&self, capability: Capability) -> Result<(), Rejection> {
        if self.role.allows(capability) {
            Ok(())
        } else {
            warn!("User {} lacks {:?}", self.user_id, capability);
            Err((StatusCode::FORBIDDEN, "Insufficient permissions".to_string()))
        }
    }
}

/// Extracts the auth session id from the `session` cookie.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session cookie and loads the caller.
///
/// If valid, inserts an `AuthUser` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Parse session ID from cookie
    let auth_session_id = session_id_from_headers(req.headers())
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_string();

    // 2. Validate auth session in database, get user_id
    let user_id = state
        .db
        .validate_auth_session(&auth_session_id, state.now())
        .await
        .map_err(|e| {
            warn!("Rejected auth session: {:?}", e);
            StatusCode::UNAUTHORIZED
        })?;

    // 3. Load the user so handlers see the current role
    let user = state.db.get_user_by_id(user_id).await.map_err(|e| {
        error!("Session {} points at a missing user: {:?}", auth_session_id, e);
        StatusCode::UNAUTHORIZED
    })?;

    // 4. Insert the caller into request extensions
    req.extensions_mut().insert(AuthUser {
        user_id: user.user_id,
        role: user.role,
    });

    // 5. Continue to the handler
    Ok(next.run(req).await)
}
