//! Invitation endpoints
//!
//! Owners manage invitations under `/api/projects/:id/invitations`; invitees
//! use the token endpoints under `/api/invitations`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shipyard_common::models::{Invitation, InvitationStatus, ProjectMember};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::services::invitations::{
    self, CreateInvitationRequest, InvitationPreview, IssuedInvitation, TokenRequest,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct InvitationListQuery {
    pub status: Option<InvitationStatus>,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub token: String,
}

/// POST /api/projects/:id/invitations
pub async fn create_invitation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(request): Json<CreateInvitationRequest>,
) -> ApiResult<(StatusCode, Json<IssuedInvitation>)> {
    let issued = invitations::create_invitation(&state, &user, project_id, request).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// GET /api/projects/:id/invitations
pub async fn list_project_invitations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
    Query(query): Query<InvitationListQuery>,
) -> ApiResult<Json<Vec<Invitation>>> {
    Ok(Json(
        invitations::list_project_invitations(&state, &user, project_id, query.status).await?,
    ))
}

/// POST /api/projects/:id/invitations/:invitation_id/revoke
pub async fn revoke_invitation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, invitation_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Invitation>> {
    Ok(Json(
        invitations::revoke_invitation(&state, &user, project_id, invitation_id).await?,
    ))
}

/// POST /api/projects/:id/invitations/:invitation_id/resend
pub async fn resend_invitation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, invitation_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<IssuedInvitation>> {
    Ok(Json(
        invitations::resend_invitation(&state, &user, project_id, invitation_id).await?,
    ))
}

/// GET /api/invitations
pub async fn list_my_invitations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<InvitationPreview>>> {
    Ok(Json(invitations::list_my_invitations(&state, &user).await?))
}

/// GET /api/invitations/lookup?token=
pub async fn lookup_invitation(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<LookupQuery>,
) -> ApiResult<Json<InvitationPreview>> {
    Ok(Json(invitations::lookup_invitation(&state, &query.token).await?))
}

/// POST /api/invitations/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<TokenRequest>,
) -> ApiResult<Json<ProjectMember>> {
    Ok(Json(
        invitations::accept_invitation(&state, &user, &request.token).await?,
    ))
}

/// POST /api/invitations/decline
pub async fn decline_invitation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<TokenRequest>,
) -> ApiResult<Json<Invitation>> {
    Ok(Json(
        invitations::decline_invitation(&state, &user, &request.token).await?,
    ))
}

pub fn invitation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/projects/:id/invitations",
            get(list_project_invitations).post(create_invitation),
        )
        .route(
            "/api/projects/:id/invitations/:invitation_id/revoke",
            post(revoke_invitation),
        )
        .route(
            "/api/projects/:id/invitations/:invitation_id/resend",
            post(resend_invitation),
        )
        .route("/api/invitations", get(list_my_invitations))
        .route("/api/invitations/lookup", get(lookup_invitation))
        .route("/api/invitations/accept", post(accept_invitation))
        .route("/api/invitations/decline", post(decline_invitation))
}
