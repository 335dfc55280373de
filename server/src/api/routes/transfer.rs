//! Whole-project export and import

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::extractors::{IdPath, ValidationRejection};
use crate::api::types::{ApiError, ApiResponse};
use crate::domain::DomainServices;
use crate::domain::models::{KeyValues, UpsertSummary};

type JsonResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Batch endpoints, with paths relative to the API prefix
pub fn batch_routes(services: DomainServices) -> Router<()> {
    Router::new()
        .route("/exports/project/{id}", get(export_project))
        .route("/imports/project/{id}", post(import_project))
        .with_state(services)
}

/// Key -> language code -> value
pub async fn export_project(
    State(services): State<DomainServices>,
    IdPath(project_id): IdPath,
) -> JsonResult<KeyValues> {
    Ok(ApiResponse::ok(services.translations.export(project_id).await?))
}

/// Accepts key -> code -> value or code -> key -> value
pub async fn import_project(
    State(services): State<DomainServices>,
    IdPath(project_id): IdPath,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> JsonResult<UpsertSummary> {
    let Json(data) = body.map_err(ValidationRejection::Json)?;
    let summary = services.translations.import(project_id, data).await?;
    tracing::info!(
        project_id,
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        "Project translations imported"
    );
    Ok(ApiResponse::ok(summary))
}
