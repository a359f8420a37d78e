//! User database operations

use chrono::{DateTime, Utc};
use shipyard_common::models::User;
use shipyard_common::{time, Result, UserRole};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{enum_col, opt_ts_col, ts_col, uuid_col};

const COLUMNS: &str =
    "id, auth_subject, email, display_name, role, created_at, updated_at, last_login_at";

fn from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: uuid_col(row, "id")?,
        auth_subject: row.try_get("auth_subject")?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        role: enum_col(row, "role")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
        last_login_at: opt_ts_col(row, "last_login_at")?,
    })
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn find_by_subject(pool: &SqlitePool, subject: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE auth_subject = ?", COLUMNS))
        .bind(subject)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn insert<'e, E>(exec: E, user: &User) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO users (
            id, auth_subject, email, display_name, role,
            created_at, updated_at, last_login_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.auth_subject)
    .bind(&user.email)
    .bind(&user.display_name)
    .bind(user.role.as_str())
    .bind(time::to_db(user.created_at))
    .bind(time::to_db(user.updated_at))
    .bind(user.last_login_at.map(time::to_db))
    .execute(exec)
    .await?;

    Ok(())
}

/// Sync provider-owned fields and record the login
pub async fn record_login(
    pool: &SqlitePool,
    id: Uuid,
    email: &str,
    role: UserRole,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE users SET email = ?, role = ?, last_login_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(email)
    .bind(role.as_str())
    .bind(time::to_db(at))
    .bind(time::to_db(at))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_display_name(
    pool: &SqlitePool,
    id: Uuid,
    display_name: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE users SET display_name = ?, updated_at = ? WHERE id = ?")
        .bind(display_name)
        .bind(time::to_db(at))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Change a user's global role
///
/// An admin is only demoted while another admin exists; returns false when
/// the user is missing or is the last admin.
pub async fn update_role(pool: &SqlitePool, id: Uuid, role: UserRole, at: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET role = ?, updated_at = ? \
         WHERE id = ? \
           AND (role <> 'admin' OR ? = 'admin' \
                OR (SELECT COUNT(*) FROM users WHERE role = 'admin') > 1)",
    )
    .bind(role.as_str())
    .bind(time::to_db(at))
    .bind(id.to_string())
    .bind(role.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_admins(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Ordered by email
pub async fn list(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM users ORDER BY email, created_at LIMIT ? OFFSET ?",
        COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}
