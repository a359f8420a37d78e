//! Users and global roles

use chrono::Duration;
use serde::Deserialize;
use shipyard_common::models::User;
use shipyard_common::validation::{validate_email, validate_name};
use shipyard_common::{time, UserRole};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Claims;
use crate::authz;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{Page, PageParams};
use crate::AppState;

/// `last_login_at` is only rewritten when older than this
const LOGIN_WRITE_INTERVAL_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRoleRequest {
    pub role: UserRole,
}

/// Map verified token claims to the local user, creating it on first login
///
/// Applies admin bootstrapping: emails listed in `auth.admin_emails` are
/// promoted to Admin; with no list configured, the first user becomes Admin
/// when no admin exists yet.
pub async fn resolve_login(state: &AppState, claims: &Claims) -> ApiResult<User> {
    let email = validate_email(claims.email.as_deref().unwrap_or_default())
        .map_err(|e| ApiError::Unauthorized(format!("Token email rejected: {}", e)))?;
    let now = time::now();
    let admin_emails = state.config.admin_emails();
    let listed_admin = admin_emails.contains(&email);

    if let Some(user) = db::users::find_by_subject(&state.db, &claims.sub).await? {
        return sync_login(state, user, email, listed_admin, admin_emails.is_empty()).await;
    }

    let bootstrap_admin =
        admin_emails.is_empty() && db::users::count_admins(&state.db).await? == 0;
    let role = if listed_admin || bootstrap_admin {
        UserRole::Admin
    } else {
        UserRole::User
    };

    let display_name = claims
        .display_name()
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    let user = User {
        id: Uuid::new_v4(),
        auth_subject: claims.sub.clone(),
        email,
        display_name,
        role,
        created_at: now,
        updated_at: now,
        last_login_at: Some(now),
    };

    match db::users::insert(&state.db, &user).await {
        Ok(()) => {
            info!(user_id = %user.id, role = %user.role, "Created user on first login");
            Ok(user)
        }
        // Concurrent first requests with the same token: keep the winner's row
        Err(e) if e.is_unique_violation() => db::users::find_by_subject(&state.db, &claims.sub)
            .await?
            .ok_or_else(|| ApiError::Internal("User vanished after insert conflict".to_string())),
        Err(e) => Err(e.into()),
    }
}

async fn sync_login(
    state: &AppState,
    mut user: User,
    email: String,
    listed_admin: bool,
    no_admin_list: bool,
) -> ApiResult<User> {
    let now = time::now();

    let mut role = user.role;
    if listed_admin && !role.is_admin() {
        info!(user_id = %user.id, "Promoting user listed in auth.admin_emails");
        role = UserRole::Admin;
    } else if no_admin_list && !role.is_admin() && db::users::count_admins(&state.db).await? == 0 {
        warn!(user_id = %user.id, "No administrator exists; promoting user on login");
        role = UserRole::Admin;
    }

    let stale = user
        .last_login_at
        .map_or(true, |at| now - at >= Duration::seconds(LOGIN_WRITE_INTERVAL_SECS));

    if email != user.email || role != user.role || stale {
        db::users::record_login(&state.db, user.id, &email, role, now).await?;
        user.email = email;
        user.role = role;
        user.last_login_at = Some(now);
        user.updated_at = now;
    }

    Ok(user)
}

/// PATCH /api/me
pub async fn update_profile(state: &AppState, actor: &User, request: UpdateProfileRequest) -> ApiResult<User> {
    let display_name = validate_name(&request.display_name, "display_name")?;
    db::users::update_display_name(&state.db, actor.id, &display_name, time::now()).await?;

    load(state, actor.id).await
}

/// GET /api/users (admin)
pub async fn list_users(state: &AppState, actor: &User, params: PageParams) -> ApiResult<Page<User>> {
    authz::require_admin(actor)?;

    let total = db::users::count(&state.db).await?;
    let pagination = params.paginate(&state.config.server, total);
    let users = db::users::list(&state.db, pagination.per_page, pagination.offset).await?;

    Ok(Page::new(users, pagination, total))
}

/// PATCH /api/users/:id/role (admin)
///
/// The last remaining admin cannot be demoted.
pub async fn update_user_role(
    state: &AppState,
    actor: &User,
    user_id: Uuid,
    request: UpdateUserRoleRequest,
) -> ApiResult<User> {
    authz::require_admin(actor)?;

    let target = load(state, user_id).await?;
    if target.role == request.role {
        return Ok(target);
    }

    if !db::users::update_role(&state.db, user_id, request.role, time::now()).await? {
        // Missing users surface as 404; anything else was the last admin
        load(state, user_id).await?;
        return Err(ApiError::Conflict(
            "Cannot demote the last administrator".to_string(),
        ));
    }
    info!(
        actor_id = %actor.id,
        user_id = %user_id,
        role = %request.role,
        "Changed global role"
    );

    load(state, user_id).await
}

async fn load(state: &AppState, user_id: Uuid) -> ApiResult<User> {
    db::users::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))
}
