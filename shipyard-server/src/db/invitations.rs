//! Invitation database operations

use chrono::{DateTime, Utc};
use shipyard_common::models::{Invitation, InvitationStatus};
use shipyard_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{enum_col, opt_ts_col, opt_uuid_col, ts_col, uuid_col};

const COLUMNS: &str = "id, project_id, email, role, token_hash, status, invited_by, \
                       created_at, expires_at, responded_at, accepted_by";

fn from_row(row: &SqliteRow) -> Result<Invitation> {
    Ok(Invitation {
        id: uuid_col(row, "id")?,
        project_id: uuid_col(row, "project_id")?,
        email: row.try_get("email")?,
        role: enum_col(row, "role")?,
        token_hash: row.try_get("token_hash")?,
        status: enum_col(row, "status")?,
        invited_by: uuid_col(row, "invited_by")?,
        created_at: ts_col(row, "created_at")?,
        expires_at: ts_col(row, "expires_at")?,
        responded_at: opt_ts_col(row, "responded_at")?,
        accepted_by: opt_uuid_col(row, "accepted_by")?,
    })
}

pub async fn insert(pool: &SqlitePool, invitation: &Invitation) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO invitations (
            id, project_id, email, role, token_hash, status, invited_by,
            created_at, expires_at, responded_at, accepted_by
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(invitation.id.to_string())
    .bind(invitation.project_id.to_string())
    .bind(&invitation.email)
    .bind(invitation.role.as_str())
    .bind(&invitation.token_hash)
    .bind(invitation.status.as_str())
    .bind(invitation.invited_by.to_string())
    .bind(time::to_db(invitation.created_at))
    .bind(time::to_db(invitation.expires_at))
    .bind(invitation.responded_at.map(time::to_db))
    .bind(invitation.accepted_by.map(|id| id.to_string()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Invitation `id` scoped to `project_id`
pub async fn find(pool: &SqlitePool, project_id: Uuid, id: Uuid) -> Result<Option<Invitation>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM invitations WHERE id = ? AND project_id = ?",
        COLUMNS
    ))
    .bind(id.to_string())
    .bind(project_id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn find_by_token_hash(pool: &SqlitePool, token_hash: &str) -> Result<Option<Invitation>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM invitations WHERE token_hash = ?",
        COLUMNS
    ))
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(from_row).transpose()
}

/// The pending invitation for `email` in a project, if any
pub async fn find_pending_for_email(
    pool: &SqlitePool,
    project_id: Uuid,
    email: &str,
) -> Result<Option<Invitation>> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {} FROM invitations
        WHERE project_id = ? AND email = ? AND status = 'pending'
        ORDER BY created_at DESC
        LIMIT 1
        "#,
        COLUMNS
    ))
    .bind(project_id.to_string())
    .bind(email)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(from_row).transpose()
}

/// Newest first, optionally narrowed to one status
pub async fn list_for_project(
    pool: &SqlitePool,
    project_id: Uuid,
    status: Option<InvitationStatus>,
) -> Result<Vec<Invitation>> {
    let status = status.map(|s| s.as_str());
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM invitations
        WHERE project_id = ? AND (? IS NULL OR status = ?)
        ORDER BY created_at DESC, id
        "#,
        COLUMNS
    ))
    .bind(project_id.to_string())
    .bind(status)
    .bind(status)
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

/// Pending invitations addressed to `email` that have not expired by `now`
pub async fn list_pending_for_email(
    pool: &SqlitePool,
    email: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Invitation>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM invitations
        WHERE email = ? AND status = 'pending' AND expires_at > ?
        ORDER BY created_at DESC, id
        "#,
        COLUMNS
    ))
    .bind(email)
    .bind(time::to_db(now))
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

/// Move a pending invitation to `status`
///
/// Only rows still Pending are touched; returns false when another request
/// already responded, which keeps tokens single use.
pub async fn respond<'e, E>(
    exec: E,
    id: Uuid,
    status: InvitationStatus,
    at: DateTime<Utc>,
    accepted_by: Option<Uuid>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE invitations
        SET status = ?, responded_at = ?, accepted_by = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(status.as_str())
    .bind(time::to_db(at))
    .bind(accepted_by.map(|id| id.to_string()))
    .bind(id.to_string())
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Mark a pending invitation Expired without recording a response
pub async fn mark_expired(pool: &SqlitePool, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE invitations SET status = 'expired' WHERE id = ? AND status = 'pending'")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Replace the token and expiry, returning the invitation to Pending
///
/// Only Pending or Expired rows are reissued, and only while no other live
/// Pending invitation exists for the same address; returns false otherwise.
pub async fn reissue(
    pool: &SqlitePool,
    id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE invitations
        SET token_hash = ?, expires_at = ?, status = 'pending', responded_at = NULL
        WHERE id = ? AND status IN ('pending', 'expired')
          AND NOT EXISTS (
              SELECT 1 FROM invitations other
              WHERE other.project_id = invitations.project_id
                AND other.email = invitations.email
                AND other.id <> invitations.id
                AND other.status = 'pending'
                AND other.expires_at > ?
          )
        "#,
    )
    .bind(token_hash)
    .bind(time::to_db(expires_at))
    .bind(id.to_string())
    .bind(time::to_db(now))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark every pending invitation of a project that expired by `now`
pub async fn expire_stale(pool: &SqlitePool, project_id: Uuid, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE invitations SET status = 'expired'
        WHERE project_id = ? AND status = 'pending' AND expires_at <= ?
        "#,
    )
    .bind(project_id.to_string())
    .bind(time::to_db(now))
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
