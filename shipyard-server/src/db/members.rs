//! Project membership database operations

use chrono::{DateTime, Utc};
use shipyard_common::models::ProjectMember;
use shipyard_common::{time, ProjectRole, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{enum_col, ts_col, uuid_col};

/// Guard clause: the project (bound once) has more than one Owner
const OTHER_OWNER_EXISTS: &str =
    "(SELECT COUNT(*) FROM project_members WHERE project_id = ? AND role = 'owner') > 1";

fn from_row(row: &SqliteRow) -> Result<ProjectMember> {
    Ok(ProjectMember {
        project_id: uuid_col(row, "project_id")?,
        user_id: uuid_col(row, "user_id")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        role: enum_col(row, "role")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

/// Role of `user_id` in `project_id`, if they are a member
pub async fn find_role<'e, E>(exec: E, project_id: Uuid, user_id: Uuid) -> Result<Option<ProjectRole>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let role: Option<String> =
        sqlx::query_scalar("SELECT role FROM project_members WHERE project_id = ? AND user_id = ?")
            .bind(project_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(exec)
            .await?;
    role.map(|r| r.parse()).transpose()
}

pub async fn find(pool: &SqlitePool, project_id: Uuid, user_id: Uuid) -> Result<Option<ProjectMember>> {
    let row = sqlx::query(
        r#"
        SELECT m.project_id, m.user_id, u.email, u.display_name, m.role, m.created_at, m.updated_at
        FROM project_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.project_id = ? AND m.user_id = ?
        "#,
    )
    .bind(project_id.to_string())
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn insert<'e, E>(
    exec: E,
    project_id: Uuid,
    user_id: Uuid,
    role: ProjectRole,
    at: DateTime<Utc>,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO project_members (project_id, user_id, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(project_id.to_string())
    .bind(user_id.to_string())
    .bind(role.as_str())
    .bind(time::to_db(at))
    .bind(time::to_db(at))
    .execute(exec)
    .await?;

    Ok(())
}

/// Change a member's role
///
/// An Owner is only moved to another role while a second Owner exists; the
/// count is evaluated inside the UPDATE so concurrent demotions cannot both
/// pass. Returns false when the row is missing or the guard refused.
pub async fn update_role<'e, E>(
    exec: E,
    project_id: Uuid,
    user_id: Uuid,
    role: ProjectRole,
    at: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(&format!(
        r#"
        UPDATE project_members SET role = ?, updated_at = ?
        WHERE project_id = ? AND user_id = ?
          AND (role <> 'owner' OR ? = 'owner' OR {})
        "#,
        OTHER_OWNER_EXISTS
    ))
    .bind(role.as_str())
    .bind(time::to_db(at))
    .bind(project_id.to_string())
    .bind(user_id.to_string())
    .bind(role.as_str())
    .bind(project_id.to_string())
    .execute(exec)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove a member; the last Owner is never removed
pub async fn delete(pool: &SqlitePool, project_id: Uuid, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query(&format!(
        r#"
        DELETE FROM project_members
        WHERE project_id = ? AND user_id = ?
          AND (role <> 'owner' OR {})
        "#,
        OTHER_OWNER_EXISTS
    ))
    .bind(project_id.to_string())
    .bind(user_id.to_string())
    .bind(project_id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Members ordered owners first, then by email
pub async fn list(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<ProjectMember>> {
    let rows = sqlx::query(
        r#"
        SELECT m.project_id, m.user_id, u.email, u.display_name, m.role, m.created_at, m.updated_at
        FROM project_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.project_id = ?
        ORDER BY CASE m.role WHEN 'owner' THEN 0 WHEN 'editor' THEN 1 ELSE 2 END, u.email
        "#,
    )
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

/// Whether any user with `email` is already a member of the project
pub async fn email_is_member(pool: &SqlitePool, project_id: Uuid, email: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM project_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.project_id = ? AND u.email = ?
        "#,
    )
    .bind(project_id.to_string())
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}
