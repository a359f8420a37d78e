//! Environment endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use shipyard_common::models::Environment;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::services::environments::{
    self, CreateEnvironmentRequest, EnvironmentView, UpdateEnvironmentRequest,
};
use crate::AppState;

/// GET /api/projects/:id/environments
pub async fn list_environments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<EnvironmentView>>> {
    Ok(Json(environments::list_environments(&state, &user, project_id).await?))
}

/// POST /api/projects/:id/environments
pub async fn create_environment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(request): Json<CreateEnvironmentRequest>,
) -> ApiResult<(StatusCode, Json<Environment>)> {
    let environment = environments::create_environment(&state, &user, project_id, request).await?;
    Ok((StatusCode::CREATED, Json(environment)))
}

/// GET /api/projects/:id/environments/:environment_id
pub async fn get_environment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, environment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<EnvironmentView>> {
    Ok(Json(
        environments::get_environment(&state, &user, project_id, environment_id).await?,
    ))
}

/// PATCH /api/projects/:id/environments/:environment_id
pub async fn update_environment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, environment_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateEnvironmentRequest>,
) -> ApiResult<Json<Environment>> {
    Ok(Json(
        environments::update_environment(&state, &user, project_id, environment_id, request).await?,
    ))
}

/// DELETE /api/projects/:id/environments/:environment_id
pub async fn delete_environment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, environment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    environments::delete_environment(&state, &user, project_id, environment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn environment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/projects/:id/environments",
            get(list_environments).post(create_environment),
        )
        .route(
            "/api/projects/:id/environments/:environment_id",
            get(get_environment)
                .patch(update_environment)
                .delete(delete_environment),
        )
}
