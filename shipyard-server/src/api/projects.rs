//! Project endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db::projects::ProjectWithRole;
use crate::error::ApiResult;
use crate::pagination::{Page, PageParams};
use crate::services::projects::{self, CreateProjectRequest, GitHubTagsResponse, UpdateProjectRequest};
use crate::AppState;

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectWithRole>)> {
    let project = projects::create_project(&state, &user, request).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<ProjectWithRole>>> {
    Ok(Json(projects::list_projects(&state, &user, params).await?))
}

/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectWithRole>> {
    Ok(Json(projects::get_project(&state, &user, project_id).await?))
}

/// PATCH /api/projects/:id
pub async fn update_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<Json<ProjectWithRole>> {
    Ok(Json(projects::update_project(&state, &user, project_id, request).await?))
}

/// DELETE /api/projects/:id
pub async fn delete_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    projects::delete_project(&state, &user, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/projects/:id/github/tags
pub async fn github_tags(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<GitHubTagsResponse>> {
    Ok(Json(projects::github_tags(&state, &user, project_id).await?))
}

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/:id",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/api/projects/:id/github/tags", get(github_tags))
}
