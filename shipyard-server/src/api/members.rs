//! Project member endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use shipyard_common::models::ProjectMember;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::services::members::{self, UpdateMemberRoleRequest};
use crate::AppState;

/// GET /api/projects/:id/members
pub async fn list_members(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProjectMember>>> {
    Ok(Json(members::list_members(&state, &user, project_id).await?))
}

/// PATCH /api/projects/:id/members/:user_id
pub async fn update_member_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<ProjectMember>> {
    Ok(Json(
        members::update_member_role(&state, &user, project_id, user_id, request).await?,
    ))
}

/// DELETE /api/projects/:id/members/:user_id
pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    members::remove_member(&state, &user, project_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn member_routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects/:id/members", get(list_members))
        .route(
            "/api/projects/:id/members/:user_id",
            patch(update_member_role).delete(remove_member),
        )
}
