//! Project membership
//!
//! A project always keeps at least one Owner: demoting or removing the last
//! one is refused, including an Owner leaving on their own. The check runs
//! inside the write itself (see `db::members`), so two Owners demoting each
//! other at once leave exactly one Owner behind.

use serde::Deserialize;
use shipyard_common::models::{ProjectMember, User};
use shipyard_common::{time, ProjectRole};
use tracing::info;
use uuid::Uuid;

use super::projects::viewer_access;
use crate::authz;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: ProjectRole,
}

pub async fn list_members(state: &AppState, actor: &User, project_id: Uuid) -> ApiResult<Vec<ProjectMember>> {
    viewer_access(state, actor, project_id).await?;
    Ok(db::members::list(&state.db, project_id).await?)
}

/// Owner
pub async fn update_member_role(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    user_id: Uuid,
    request: UpdateMemberRoleRequest,
) -> ApiResult<ProjectMember> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require_member_management()?;

    let member = load(state, project_id, user_id).await?;
    if member.role == request.role {
        return Ok(member);
    }

    if !db::members::update_role(&state.db, project_id, user_id, request.role, time::now()).await? {
        return Err(refused_write(state, project_id, user_id).await);
    }
    info!(
        project_id = %project_id,
        user_id = %user_id,
        from = %member.role,
        to = %request.role,
        actor_id = %actor.id,
        "Changed member role"
    );

    load(state, project_id, user_id).await
}

/// Owner, or any member removing themselves
pub async fn remove_member(state: &AppState, actor: &User, project_id: Uuid, user_id: Uuid) -> ApiResult<()> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    let leaving = actor.id == user_id;
    if !leaving {
        access.require_member_management()?;
    }

    if !db::members::delete(&state.db, project_id, user_id).await? {
        return Err(refused_write(state, project_id, user_id).await);
    }
    if leaving {
        info!(project_id = %project_id, user_id = %user_id, "Member left project");
    } else {
        info!(project_id = %project_id, user_id = %user_id, actor_id = %actor.id, "Removed member");
    }

    Ok(())
}

/// Why a guarded update/delete touched no row: the member is gone, or they
/// are the last Owner
async fn refused_write(state: &AppState, project_id: Uuid, user_id: Uuid) -> ApiError {
    match load(state, project_id, user_id).await {
        Ok(_) => ApiError::Conflict("A project must keep at least one owner".to_string()),
        Err(e) => e,
    }
}

async fn load(state: &AppState, project_id: Uuid, user_id: Uuid) -> ApiResult<ProjectMember> {
    db::members::find(&state.db, project_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} is not a member of this project", user_id)))
}
