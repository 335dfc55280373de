//! Translation API endpoints
//!
//! `routes` carries the per-row endpoints under the API policy;
//! `batch_routes` carries the multi-row ones under the batch policy.

use axum::Router;
use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, post};
use serde::Deserialize;
use validator::Validate;

use crate::api::extractors::{IdPath, ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, ApiResponse, ListQuery, created, validate_limit};
use crate::data::cache::MatrixPage;
use crate::data::types::TranslationRow;
use crate::domain::DomainServices;
use crate::domain::models::{
    BatchTranslationRequest, CreateTranslationRequest, DeleteBatchRequest, TranslationMatrix,
    UpdateTranslationRequest,
};

type JsonResult<T> = Result<axum::Json<ApiResponse<T>>, ApiError>;

/// `?limit=&offset=&keyword=`; without `limit` the whole project is returned
#[derive(Debug, Deserialize, Validate)]
pub struct MatrixQuery {
    pub limit: Option<u32>,

    #[serde(default)]
    pub offset: u32,

    #[validate(length(max = 100, message = "Keyword must be at most 100 characters"))]
    pub keyword: Option<String>,
}

impl MatrixQuery {
    fn page(&self) -> Result<MatrixPage, ApiError> {
        match self.limit {
            None => Ok(MatrixPage::All),
            Some(limit) => {
                validate_limit(limit).map_err(|e| {
                    ApiError::bad_request(
                        "VALIDATION_ERROR",
                        e.message.map(|m| m.to_string()).unwrap_or_default(),
                    )
                })?;
                Ok(MatrixPage::Window {
                    limit,
                    offset: self.offset,
                })
            }
        }
    }
}

/// Build Translations API routes (mounted at `/translations`)
pub fn routes(services: DomainServices) -> Router<()> {
    Router::new()
        .route("/", post(create_translation))
        .route(
            "/{id}",
            get(get_translation)
                .put(update_translation)
                .delete(delete_translation),
        )
        .route("/by-project/{id}", get(list_by_project))
        .route("/matrix/{id}", get(matrix))
        .with_state(services)
}

/// Batch endpoints, with paths relative to the API prefix
pub fn batch_routes(services: DomainServices) -> Router<()> {
    Router::new()
        .route("/translations/batch", post(create_batch))
        .route("/translations/batch-delete", post(delete_batch))
        .with_state(services)
}

pub async fn create_translation(
    State(services): State<DomainServices>,
    ValidatedJson(body): ValidatedJson<CreateTranslationRequest>,
) -> Result<Response, ApiError> {
    Ok(created(services.translations.create(body).await?))
}

pub async fn get_translation(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
) -> JsonResult<TranslationRow> {
    Ok(ApiResponse::ok(services.translations.get_by_id(id).await?))
}

pub async fn update_translation(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
    ValidatedJson(body): ValidatedJson<UpdateTranslationRequest>,
) -> JsonResult<TranslationRow> {
    Ok(ApiResponse::ok(services.translations.update(id, body).await?))
}

pub async fn delete_translation(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
) -> JsonResult<TranslationRow> {
    Ok(ApiResponse::ok(services.translations.delete(id).await?))
}

pub async fn list_by_project(
    State(services): State<DomainServices>,
    IdPath(project_id): IdPath,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> JsonResult<Vec<TranslationRow>> {
    let page = services
        .translations
        .list_by_project(project_id, query.limit, query.offset)
        .await?;
    Ok(ApiResponse::paginated(
        page.items,
        query.limit,
        query.offset,
        page.total,
    ))
}

pub async fn matrix(
    State(services): State<DomainServices>,
    IdPath(project_id): IdPath,
    ValidatedQuery(query): ValidatedQuery<MatrixQuery>,
) -> JsonResult<TranslationMatrix> {
    let page = query.page()?;
    let matrix = services
        .translations
        .matrix(project_id, page, query.keyword.as_deref())
        .await?;
    Ok(ApiResponse::ok(matrix))
}

pub async fn create_batch(
    State(services): State<DomainServices>,
    ValidatedJson(body): ValidatedJson<BatchTranslationRequest>,
) -> Result<Response, ApiError> {
    let project_id = body.project_id;
    let rows = services.translations.create_batch(body).await?;
    tracing::info!(project_id, count = rows.len(), "Translations created in batch");
    Ok(created(rows))
}

pub async fn delete_batch(
    State(services): State<DomainServices>,
    ValidatedJson(body): ValidatedJson<DeleteBatchRequest>,
) -> JsonResult<serde_json::Value> {
    let removed = services.translations.delete_batch(&body.ids).await?;
    tracing::info!(
        requested = body.ids.len(),
        deleted = removed.len(),
        "Translations deleted in batch"
    );
    let ids: Vec<u64> = removed.iter().map(|t| t.id).collect();
    Ok(ApiResponse::ok(serde_json::json!({
        "deleted": ids.len(),
        "ids": ids,
    })))
}
