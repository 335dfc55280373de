//! Login endpoint

use axum::Router;
use axum::extract::State;
use axum::routing::post;

use crate::api::extractors::ValidatedJson;
use crate::api::types::{ApiError, ApiResponse};
use crate::domain::DomainServices;
use crate::domain::models::{LoginRequest, LoginResponse};

pub fn routes(services: DomainServices) -> Router<()> {
    Router::new()
        .route("/login", post(login))
        .with_state(services)
}

pub async fn login(
    State(services): State<DomainServices>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<axum::Json<ApiResponse<LoginResponse>>, ApiError> {
    let username = body.username.clone();
    match services.users.login(body).await {
        Ok(response) => {
            tracing::info!(user_id = response.user.id, "Login succeeded");
            Ok(ApiResponse::ok(response))
        }
        Err(e) => {
            tracing::warn!(%username, "Login failed");
            Err(e.into())
        }
    }
}
