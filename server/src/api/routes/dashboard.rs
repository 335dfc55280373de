//! Dashboard endpoint

use axum::Router;
use axum::extract::State;
use axum::routing::get;

use crate::api::types::{ApiError, ApiResponse};
use crate::domain::DomainServices;
use crate::domain::models::DashboardStats;

pub fn routes(services: DomainServices) -> Router<()> {
    Router::new()
        .route("/stats", get(stats))
        .with_state(services)
}

pub async fn stats(
    State(services): State<DomainServices>,
) -> Result<axum::Json<ApiResponse<DashboardStats>>, ApiError> {
    Ok(ApiResponse::ok(services.dashboard.stats().await?))
}
