//! User API endpoints

use axum::Router;
use axum::extract::State;
use axum::middleware::from_fn;
use axum::response::Response;
use axum::routing::get;

use crate::api::auth::require_admin;
use crate::api::extractors::{IdPath, ValidatedJson, ValidatedQuery};
use crate::api::types::{ApiError, ApiResponse, ListQuery, created};
use crate::domain::DomainServices;
use crate::domain::models::{CreateUserRequest, UpdateUserRequest, User};

type JsonResult<T> = Result<axum::Json<ApiResponse<T>>, ApiError>;

/// Build Users API routes, admin only
pub fn routes(services: DomainServices) -> Router<()> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .route_layer(from_fn(require_admin))
        .with_state(services)
}

pub async fn list_users(
    State(services): State<DomainServices>,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> JsonResult<Vec<User>> {
    let page = services
        .users
        .list(query.limit, query.offset, query.keyword.as_deref())
        .await?;
    Ok(ApiResponse::paginated(
        page.items,
        query.limit,
        query.offset,
        page.total,
    ))
}

pub async fn create_user(
    State(services): State<DomainServices>,
    ValidatedJson(body): ValidatedJson<CreateUserRequest>,
) -> Result<Response, ApiError> {
    let user = services.users.create(body).await?;
    tracing::info!(user_id = user.id, username = %user.username, "User created");
    Ok(created(user))
}

pub async fn get_user(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
) -> JsonResult<User> {
    Ok(ApiResponse::ok(services.users.get_by_id(id).await?))
}

pub async fn update_user(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> JsonResult<User> {
    Ok(ApiResponse::ok(services.users.update(id, body).await?))
}

pub async fn delete_user(
    State(services): State<DomainServices>,
    IdPath(id): IdPath,
) -> JsonResult<serde_json::Value> {
    services.users.delete(id).await?;
    Ok(ApiResponse::ok(serde_json::json!({ "id": id })))
}
