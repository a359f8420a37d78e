//! Release endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shipyard_common::models::{Release, ReleaseStatus};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::pagination::{Page, PageParams};
use crate::services::releases::{self, CreateReleaseRequest, UpdateReleaseRequest};
use crate::AppState;

/// Query parameters for listing releases
#[derive(Debug, Default, Deserialize)]
pub struct ReleaseListQuery {
    pub status: Option<ReleaseStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// GET /api/projects/:id/releases
pub async fn list_releases(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ReleaseListQuery>,
) -> ApiResult<Json<Page<Release>>> {
    let params = PageParams {
        page: query.page,
        per_page: query.per_page,
    };
    Ok(Json(
        releases::list_releases(&state, &user, project_id, query.status, params).await?,
    ))
}

/// POST /api/projects/:id/releases
pub async fn create_release(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(request): Json<CreateReleaseRequest>,
) -> ApiResult<(StatusCode, Json<Release>)> {
    let release = releases::create_release(&state, &user, project_id, request).await?;
    Ok((StatusCode::CREATED, Json(release)))
}

/// GET /api/projects/:id/releases/:release_id
pub async fn get_release(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, release_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Release>> {
    Ok(Json(releases::get_release(&state, &user, project_id, release_id).await?))
}

/// PATCH /api/projects/:id/releases/:release_id
pub async fn update_release(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, release_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateReleaseRequest>,
) -> ApiResult<Json<Release>> {
    Ok(Json(
        releases::update_release(&state, &user, project_id, release_id, request).await?,
    ))
}

/// DELETE /api/projects/:id/releases/:release_id
pub async fn delete_release(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, release_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    releases::delete_release(&state, &user, project_id, release_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/projects/:id/releases/:release_id/publish
pub async fn publish_release(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, release_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Release>> {
    Ok(Json(releases::publish_release(&state, &user, project_id, release_id).await?))
}

/// POST /api/projects/:id/releases/:release_id/github-sync
pub async fn sync_github_release(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, release_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Release>> {
    Ok(Json(
        releases::sync_github_release(&state, &user, project_id, release_id).await?,
    ))
}

pub fn release_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/projects/:id/releases",
            get(list_releases).post(create_release),
        )
        .route(
            "/api/projects/:id/releases/:release_id",
            get(get_release).patch(update_release).delete(delete_release),
        )
        .route(
            "/api/projects/:id/releases/:release_id/publish",
            post(publish_release),
        )
        .route(
            "/api/projects/:id/releases/:release_id/github-sync",
            post(sync_github_release),
        )
}
