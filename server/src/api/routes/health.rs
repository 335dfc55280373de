//! Health check endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::data::cache::CacheService;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub cache: &'static str,
}

pub fn routes(cache: Arc<CacheService>) -> Router<()> {
    Router::new().route("/health", get(health)).with_state(cache)
}

/// Service status plus cache backend reachability
pub async fn health(State(cache): State<Arc<CacheService>>) -> impl IntoResponse {
    let (status, cache_status) = match cache.health_check().await {
        Ok(()) => ("ok", "ok"),
        Err(e) => {
            tracing::warn!(error = %e, backend = cache.backend_name(), "Cache health check failed");
            ("degraded", "unavailable")
        }
    };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            cache: cache_status,
        }),
    )
}
