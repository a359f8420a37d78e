//! Project invitations
//!
//! Lifecycle: Pending → Accepted | Declined | Revoked | Expired. Expiry is
//! applied lazily: a Pending invitation past `expires_at` is marked Expired
//! the first time it is touched. Owners can resend a Pending or Expired
//! invitation, which issues a fresh token and expiry.
//!
//! The raw token only leaves the service in the create/resend response and
//! the invitation email; lookups go through its SHA-256 hash.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shipyard_common::models::{Invitation, InvitationStatus, Project, ProjectMember, User};
use shipyard_common::tokens::{generate_invitation_token, hash_token, looks_like_token};
use shipyard_common::validation::validate_email;
use shipyard_common::{time, ProjectRole};
use tracing::{info, warn};
use uuid::Uuid;

use crate::authz::{self, ProjectAccess};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::integrations::messages;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role: ProjectRole,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Invitation plus the one-time acceptance link
#[derive(Debug, Serialize)]
pub struct IssuedInvitation {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub accept_url: String,
}

/// What an invitee sees before accepting
#[derive(Debug, Serialize)]
pub struct InvitationPreview {
    pub id: Uuid,
    pub project_id: Uuid,
    pub project_name: String,
    pub email: String,
    pub role: ProjectRole,
    pub inviter_email: Option<String>,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
}

/// Owner
///
/// Refuses to invite existing members, and refuses a second live invitation
/// for the same address.
pub async fn create_invitation(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    request: CreateInvitationRequest,
) -> ApiResult<IssuedInvitation> {
    let access = member_manager(state, actor, project_id).await?;
    let email = validate_email(&request.email)?;
    let now = time::now();

    if db::members::email_is_member(&state.db, project_id, &email).await? {
        return Err(ApiError::Conflict(format!(
            "{} is already a member of this project",
            email
        )));
    }
    if let Some(existing) = db::invitations::find_pending_for_email(&state.db, project_id, &email).await? {
        if existing.is_expired_at(now) {
            db::invitations::mark_expired(&state.db, existing.id).await?;
        } else {
            return Err(ApiError::Conflict(format!(
                "{} already has a pending invitation",
                email
            )));
        }
    }

    let token = generate_invitation_token();
    let invitation = Invitation {
        id: Uuid::new_v4(),
        project_id,
        email,
        role: request.role,
        token_hash: hash_token(&token),
        status: InvitationStatus::Pending,
        invited_by: actor.id,
        created_at: now,
        expires_at: expiry_from(state, now)?,
        responded_at: None,
        accepted_by: None,
    };
    db::invitations::insert(&state.db, &invitation).await?;
    info!(
        project_id = %project_id,
        invitation_id = %invitation.id,
        role = %invitation.role,
        actor_id = %actor.id,
        "Created invitation"
    );

    let accept_url = accept_url(state, &token);
    send_invitation_email(state, &access.project, actor, &invitation, &accept_url).await;

    Ok(IssuedInvitation {
        invitation,
        accept_url,
    })
}

/// Owner; stale Pending rows are marked Expired first
pub async fn list_project_invitations(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    status: Option<InvitationStatus>,
) -> ApiResult<Vec<Invitation>> {
    member_manager(state, actor, project_id).await?;

    db::invitations::expire_stale(&state.db, project_id, time::now()).await?;
    Ok(db::invitations::list_for_project(&state.db, project_id, status).await?)
}

/// GET /api/invitations: live invitations addressed to the caller
pub async fn list_my_invitations(state: &AppState, actor: &User) -> ApiResult<Vec<InvitationPreview>> {
    let invitations =
        db::invitations::list_pending_for_email(&state.db, &actor.email.to_ascii_lowercase(), time::now())
            .await?;

    let mut previews = Vec::with_capacity(invitations.len());
    for invitation in invitations {
        previews.push(preview(state, invitation).await?);
    }
    Ok(previews)
}

/// GET /api/invitations/lookup?token=
pub async fn lookup_invitation(state: &AppState, token: &str) -> ApiResult<InvitationPreview> {
    let mut invitation = find_by_token(state, token).await?;
    expire_if_stale(state, &mut invitation, time::now()).await?;
    preview(state, invitation).await
}

/// Accept with the token; the caller's email must match the invitation
///
/// Membership is created, or an existing lower role raised (never lowered),
/// in the same transaction that marks the invitation Accepted.
pub async fn accept_invitation(state: &AppState, actor: &User, token: &str) -> ApiResult<ProjectMember> {
    let now = time::now();
    let invitation = respondable(state, actor, token, now).await?;

    let mut tx = state.db.begin().await?;
    let role = match db::members::find_role(&mut *tx, invitation.project_id, actor.id).await? {
        None => {
            db::members::insert(&mut *tx, invitation.project_id, actor.id, invitation.role, now).await?;
            invitation.role
        }
        Some(current) if invitation.role.rank() > current.rank() => {
            db::members::update_role(&mut *tx, invitation.project_id, actor.id, invitation.role, now)
                .await?;
            invitation.role
        }
        Some(current) => current,
    };
    if !db::invitations::respond(&mut *tx, invitation.id, InvitationStatus::Accepted, now, Some(actor.id))
        .await?
    {
        tx.rollback().await?;
        return Err(ApiError::Conflict("Invitation was already answered".to_string()));
    }
    tx.commit().await?;

    info!(
        project_id = %invitation.project_id,
        invitation_id = %invitation.id,
        user_id = %actor.id,
        role = %role,
        "Invitation accepted"
    );

    db::members::find(&state.db, invitation.project_id, actor.id)
        .await?
        .ok_or_else(|| ApiError::Internal("Membership missing after acceptance".to_string()))
}

/// Decline with the token; same checks as accepting
pub async fn decline_invitation(state: &AppState, actor: &User, token: &str) -> ApiResult<Invitation> {
    let now = time::now();
    let mut invitation = respondable(state, actor, token, now).await?;

    if !db::invitations::respond(&state.db, invitation.id, InvitationStatus::Declined, now, None).await? {
        return Err(ApiError::Conflict("Invitation was already answered".to_string()));
    }
    info!(invitation_id = %invitation.id, user_id = %actor.id, "Invitation declined");

    invitation.status = InvitationStatus::Declined;
    invitation.responded_at = Some(now);
    Ok(invitation)
}

/// Owner; Pending → Revoked
pub async fn revoke_invitation(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    invitation_id: Uuid,
) -> ApiResult<Invitation> {
    member_manager(state, actor, project_id).await?;
    let mut invitation = load(state, project_id, invitation_id).await?;

    let now = time::now();
    if invitation.status != InvitationStatus::Pending
        || !db::invitations::respond(&state.db, invitation.id, InvitationStatus::Revoked, now, None).await?
    {
        return Err(ApiError::Conflict(format!(
            "Only pending invitations can be revoked (status: {})",
            invitation.status
        )));
    }
    info!(invitation_id = %invitation.id, actor_id = %actor.id, "Invitation revoked");

    invitation.status = InvitationStatus::Revoked;
    invitation.responded_at = Some(now);
    Ok(invitation)
}

/// Owner; Pending or Expired → Pending with a new token and expiry
///
/// Refused like a new invitation would be: the address already belongs to a
/// member, or another live invitation for it exists.
pub async fn resend_invitation(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    invitation_id: Uuid,
) -> ApiResult<IssuedInvitation> {
    let access = member_manager(state, actor, project_id).await?;
    let mut invitation = load(state, project_id, invitation_id).await?;

    if !matches!(
        invitation.status,
        InvitationStatus::Pending | InvitationStatus::Expired
    ) {
        return Err(ApiError::Conflict(format!(
            "Cannot resend an invitation that was {}",
            invitation.status
        )));
    }

    let now = time::now();
    if db::members::email_is_member(&state.db, project_id, &invitation.email).await? {
        return Err(ApiError::Conflict(format!(
            "{} is already a member of this project",
            invitation.email
        )));
    }
    if let Some(other) =
        db::invitations::find_pending_for_email(&state.db, project_id, &invitation.email).await?
    {
        if other.id != invitation.id && other.is_expired_at(now) {
            db::invitations::mark_expired(&state.db, other.id).await?;
        }
    }

    let token = generate_invitation_token();
    let token_hash = hash_token(&token);
    let expires_at = expiry_from(state, now)?;
    if !db::invitations::reissue(&state.db, invitation.id, &token_hash, expires_at, now).await? {
        return Err(ApiError::Conflict(format!(
            "{} already has a pending invitation",
            invitation.email
        )));
    }
    invitation.token_hash = token_hash;
    invitation.expires_at = expires_at;
    invitation.status = InvitationStatus::Pending;
    invitation.responded_at = None;
    info!(invitation_id = %invitation.id, actor_id = %actor.id, "Invitation reissued");

    let accept_url = accept_url(state, &token);
    send_invitation_email(state, &access.project, actor, &invitation, &accept_url).await;

    Ok(IssuedInvitation {
        invitation,
        accept_url,
    })
}

async fn member_manager(state: &AppState, actor: &User, project_id: Uuid) -> ApiResult<ProjectAccess> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require_member_management()?;
    Ok(access)
}

async fn load(state: &AppState, project_id: Uuid, invitation_id: Uuid) -> ApiResult<Invitation> {
    db::invitations::find(&state.db, project_id, invitation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Invitation {} not found", invitation_id)))
}

async fn find_by_token(state: &AppState, token: &str) -> ApiResult<Invitation> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest("Missing invitation token".to_string()));
    }
    if !looks_like_token(token) {
        return Err(ApiError::NotFound("Invitation not found".to_string()));
    }

    db::invitations::find_by_token_hash(&state.db, &hash_token(token))
        .await?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))
}

/// Marks a stale Pending invitation Expired in place
async fn expire_if_stale(state: &AppState, invitation: &mut Invitation, now: DateTime<Utc>) -> ApiResult<()> {
    if invitation.status == InvitationStatus::Pending && invitation.is_expired_at(now) {
        db::invitations::mark_expired(&state.db, invitation.id).await?;
        invitation.status = InvitationStatus::Expired;
    }
    Ok(())
}

/// Resolve a token to a Pending, unexpired invitation addressed to `actor`
async fn respondable(state: &AppState, actor: &User, token: &str, now: DateTime<Utc>) -> ApiResult<Invitation> {
    let mut invitation = find_by_token(state, token).await?;
    expire_if_stale(state, &mut invitation, now).await?;

    match invitation.status {
        InvitationStatus::Pending => {}
        InvitationStatus::Expired => {
            return Err(ApiError::Gone("Invitation has expired".to_string()));
        }
        other => {
            return Err(ApiError::Conflict(format!("Invitation was already {}", other)));
        }
    }

    if !invitation.email.eq_ignore_ascii_case(&actor.email) {
        return Err(ApiError::Forbidden(
            "This invitation was sent to a different email address".to_string(),
        ));
    }

    Ok(invitation)
}

async fn preview(state: &AppState, invitation: Invitation) -> ApiResult<InvitationPreview> {
    let project = db::projects::find(&state.db, invitation.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invitation not found".to_string()))?;
    let inviter = db::users::find_by_id(&state.db, invitation.invited_by).await?;

    Ok(InvitationPreview {
        id: invitation.id,
        project_id: project.id,
        project_name: project.name,
        email: invitation.email,
        role: invitation.role,
        inviter_email: inviter.map(|u| u.email),
        status: invitation.status,
        expires_at: invitation.expires_at,
    })
}

fn expiry_from(state: &AppState, now: DateTime<Utc>) -> ApiResult<DateTime<Utc>> {
    let ttl_hours = state.config.invitations.ttl_hours;
    now.checked_add_signed(Duration::hours(i64::from(ttl_hours)))
        .ok_or_else(|| ApiError::Internal(format!("Invitation TTL of {} hours is out of range", ttl_hours)))
}

fn accept_url(state: &AppState, token: &str) -> String {
    format!(
        "{}/invitations/accept?token={}",
        state.config.server.public_base_url.trim_end_matches('/'),
        token
    )
}

async fn send_invitation_email(
    state: &AppState,
    project: &Project,
    inviter: &User,
    invitation: &Invitation,
    accept_url: &str,
) {
    let Some(mailer) = &state.integrations.mailer else {
        return;
    };

    let message = messages::invitation_email(
        &state.integrations.email_from,
        project,
        inviter,
        invitation,
        accept_url,
    );
    if let Err(e) = mailer.send(&message).await {
        warn!(invitation_id = %invitation.id, error = %e, "Invitation email failed");
    }
}
