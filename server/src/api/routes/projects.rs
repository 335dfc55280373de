//! Project API endpoints

use axum::Router;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;

use crate::api::extractors::{IdPath, ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, ApiResponse, ListQuery, created};
use crate::data::types::ProjectRow;
use crate::domain::DomainServices;
use crate::domain::models::{CreateProjectRequest, UpdateProjectRequest};

type JsonResult<T> = Result<axum::Json<ApiResponse<T>>, ApiError>;

/// Build Projects API routes
pub fn routes(services: DomainServices) -> Router<()> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .with_state(services)
}

pub async fn list_projects(
    State(services): State<DomainServices>,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> JsonResult<Vec<ProjectRow>> {
    let page = services
        .projects
        .list(query.limit, query.offset, query.keyword.as_deref())
        .await?;
    Ok(ApiResponse::paginated(
        page.items,
        query.limit,
        query.offset,
        page.total,
    ))
}

pub async fn create_project(
    State(services): State<DomainServices>,
    ValidatedJson(body): ValidatedJson<CreateProjectRequest>,
) -> Result<Response, ApiError> {
    let project = services.projects.create(body).await?;
    tracing::info!(project_id = project.id, slug = %project.slug, "Project created");
    Ok(created(project))
}

pub async fn get_project(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
) -> JsonResult<ProjectRow> {
    Ok(ApiResponse::ok(services.projects.get_by_id(id).await?))
}

pub async fn update_project(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
    ValidatedJson(body): ValidatedJson<UpdateProjectRequest>,
) -> JsonResult<ProjectRow> {
    Ok(ApiResponse::ok(services.projects.update(id, body).await?))
}

pub async fn delete_project(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
) -> JsonResult<serde_json::Value> {
    services.projects.delete(id).await?;
    tracing::info!(project_id = id, "Project deleted");
    Ok(ApiResponse::ok(serde_json::json!({ "id": id })))
}
