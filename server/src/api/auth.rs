//! Bearer token middleware
//!
//! `resolve_user` runs on every request: it resolves
//! `Authorization: Bearer <token>` through the `TokenIssuer` and injects
//! `AuthenticatedUser` into request extensions. Requests without the header
//! pass through anonymously; a token that does not resolve is rejected with
//! 401. `require_auth` and `require_admin` are route layers that gate the
//! routes behind them on that extension.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;

use super::types::ApiError;
use crate::data::types::Role;
use crate::domain::TokenIssuer;

/// The caller, as identified by a valid bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: u64,
    pub role: Role,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

pub async fn resolve_user(
    State(tokens): State<Arc<dyn TokenIssuer>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = bearer_token(request.headers()) {
        let subject = tokens
            .resolve(token)
            .ok_or_else(|| ApiError::unauthorized("TOKEN_INVALID", "Invalid or expired token"))?;
        request.extensions_mut().insert(AuthenticatedUser {
            user_id: subject.user_id,
            role: subject.role,
        });
    }
    Ok(next.run(request).await)
}

/// Reject anonymous callers
pub async fn require_auth(request: Request, next: Next) -> Result<Response, ApiError> {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        return Err(ApiError::unauthorized(
            "UNAUTHORIZED",
            "Authentication required",
        ));
    }
    Ok(next.run(request).await)
}

/// Reject callers that are not admins
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request.extensions().get::<AuthenticatedUser>().copied();
    match user {
        None => Err(ApiError::unauthorized(
            "UNAUTHORIZED",
            "Authentication required",
        )),
        Some(user) if !user.role.is_admin() => {
            tracing::debug!(user_id = user.user_id, path = %request.uri().path(), "Admin route denied");
            Err(ApiError::forbidden("FORBIDDEN", "Admin role required"))
        }
        Some(_) => Ok(next.run(request).await),
    }
}
