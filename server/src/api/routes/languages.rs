//! Language API endpoints

use axum::Router;
use axum::extract::State;
use axum::middleware::from_fn;
use axum::response::Response;
use axum::routing::{get, post, put};

use crate::api::auth::require_admin;
use crate::api::extractors::{IdPath, ValidatedJson};
use crate::api::types::{ApiError, ApiResponse, created};
use crate::data::types::LanguageRow;
use crate::domain::DomainServices;
use crate::domain::models::{CreateLanguageRequest, UpdateLanguageRequest};

type JsonResult<T> = Result<axum::Json<ApiResponse<T>>, ApiError>;

/// Build Languages API routes. Reads are open to any caller; writes need an admin.
pub fn routes(services: DomainServices) -> Router<()> {
    let writes = Router::new()
        .route("/", post(create_language))
        .route("/{id}", put(update_language).delete(delete_language))
        .route_layer(from_fn(require_admin));

    Router::new()
        .route("/", get(list_languages))
        .route("/{id}", get(get_language))
        .merge(writes)
        .with_state(services)
}

pub async fn list_languages(State(services): State<DomainServices>) -> JsonResult<Vec<LanguageRow>> {
    Ok(ApiResponse::ok(services.languages.list().await?))
}

pub async fn create_language(
    State(services): State<DomainServices>,
    ValidatedJson(body): ValidatedJson<CreateLanguageRequest>,
) -> Result<Response, ApiError> {
    let language = services.languages.create(body).await?;
    Ok(created(language))
}

pub async fn get_language(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
) -> JsonResult<LanguageRow> {
    Ok(ApiResponse::ok(services.languages.get_by_id(id).await?))
}

pub async fn update_language(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
    ValidatedJson(body): ValidatedJson<UpdateLanguageRequest>,
) -> JsonResult<LanguageRow> {
    Ok(ApiResponse::ok(services.languages.update(id, body).await?))
}

pub async fn delete_language(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
) -> JsonResult<serde_json::Value> {
    services.languages.delete(id).await?;
    Ok(ApiResponse::ok(serde_json::json!({ "id": id })))
}
