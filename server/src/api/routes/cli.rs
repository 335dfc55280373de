//! Endpoints for the command line client

use std::collections::BTreeMap;

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use serde::Deserialize;
use validator::Validate;

use crate::api::extractors::{ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, ApiResponse};
use crate::domain::DomainServices;
use crate::domain::models::{PushKeysRequest, PushKeysResult};

type JsonResult<T> = Result<axum::Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Deserialize, Validate)]
pub struct PullQuery {
    pub project_id: u64,

    /// Restrict to one language code; the response is then key -> value
    #[validate(length(min = 1, max = 16, message = "Locale must be 1-16 characters"))]
    pub locale: Option<String>,
}

/// Build CLI routes (mounted at `/cli`)
pub fn routes(services: DomainServices) -> Router<()> {
    Router::new()
        .route("/translations", get(pull_translations))
        .with_state(services)
}

/// Batch endpoints, with paths relative to the API prefix
pub fn batch_routes(services: DomainServices) -> Router<()> {
    Router::new()
        .route("/cli/keys", post(push_keys))
        .with_state(services)
}

pub async fn pull_translations(
    State(services): State<DomainServices>,
    ValidatedQuery(query): ValidatedQuery<PullQuery>,
) -> JsonResult<serde_json::Value> {
    let values = services.translations.export(query.project_id).await?;
    let data = match query.locale.as_deref() {
        Some(locale) => {
            let single: BTreeMap<String, String> = values
                .into_iter()
                .filter_map(|(key, mut by_code)| by_code.remove(locale).map(|v| (key, v)))
                .collect();
            serde_json::to_value(single)
        }
        None => serde_json::to_value(values),
    }
    .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(ApiResponse::ok(data))
}

pub async fn push_keys(
    State(services): State<DomainServices>,
    ValidatedJson(body): ValidatedJson<PushKeysRequest>,
) -> JsonResult<PushKeysResult> {
    let project_id = body.project_id;
    let result = services.translations.push_keys(body).await?;
    tracing::info!(
        project_id,
        added = result.added.len(),
        existed = result.existed.len(),
        failed = result.failed.len(),
        "Keys pushed"
    );
    Ok(ApiResponse::ok(result))
}
