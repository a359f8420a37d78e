//! Current user and user administration

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use shipyard_common::models::User;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::pagination::{Page, PageParams};
use crate::services::users::{self, UpdateProfileRequest, UpdateUserRoleRequest};
use crate::AppState;

/// GET /api/me
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// PATCH /api/me
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(users::update_profile(&state, &user, request).await?))
}

/// GET /api/users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<User>>> {
    Ok(Json(users::list_users(&state, &user, params).await?))
}

/// PATCH /api/users/:id/role (admin)
pub async fn update_user_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRoleRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(users::update_user_role(&state, &user, user_id, request).await?))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(get_me).patch(update_me))
        .route("/api/users", get(list_users))
        .route("/api/users/:id/role", patch(update_user_role))
}
