//! Project database operations

use serde::Serialize;
use shipyard_common::models::Project;
use shipyard_common::{time, ProjectRole, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{ts_col, uuid_col};

const COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.github_repo, p.slack_webhook_url, \
                       p.created_by, p.created_at, p.updated_at";

/// Project list entry with the caller's membership role
#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithRole {
    #[serde(flatten)]
    pub project: Project,
    /// `None` when an admin lists a project they are not a member of
    pub role: Option<ProjectRole>,
}

fn from_row(row: &SqliteRow) -> Result<Project> {
    Ok(Project {
        id: uuid_col(row, "id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        github_repo: row.try_get("github_repo")?,
        slack_webhook_url: row.try_get("slack_webhook_url")?,
        created_by: uuid_col(row, "created_by")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

fn with_role_from_row(row: &SqliteRow) -> Result<ProjectWithRole> {
    let role: Option<String> = row.try_get("member_role")?;
    Ok(ProjectWithRole {
        project: from_row(row)?,
        role: role.map(|r| r.parse()).transpose()?,
    })
}

pub async fn insert<'e, E>(exec: E, project: &Project) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO projects (
            id, name, slug, description, github_repo, slack_webhook_url,
            created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(project.id.to_string())
    .bind(&project.name)
    .bind(&project.slug)
    .bind(&project.description)
    .bind(&project.github_repo)
    .bind(&project.slack_webhook_url)
    .bind(project.created_by.to_string())
    .bind(time::to_db(project.created_at))
    .bind(time::to_db(project.updated_at))
    .execute(exec)
    .await?;

    Ok(())
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> Result<Option<Project>> {
    let row = sqlx::query(&format!("SELECT {} FROM projects p WHERE p.id = ?", COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// Write the mutable settings back
pub async fn update(pool: &SqlitePool, project: &Project) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE projects
        SET name = ?, description = ?, github_repo = ?, slack_webhook_url = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(&project.github_repo)
    .bind(&project.slack_webhook_url)
    .bind(time::to_db(project.updated_at))
    .bind(project.id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a project; child rows go with it through `ON DELETE CASCADE`
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Every project, with `user_id`'s role where they are a member
pub async fn list_all(
    pool: &SqlitePool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<ProjectWithRole>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}, m.role AS member_role
        FROM projects p
        LEFT JOIN project_members m ON m.project_id = p.id AND m.user_id = ?
        ORDER BY p.name, p.id
        LIMIT ? OFFSET ?
        "#,
        COLUMNS
    ))
    .bind(user_id.to_string())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    rows.iter().map(with_role_from_row).collect()
}

pub async fn count_all(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Projects `user_id` belongs to
pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<ProjectWithRole>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}, m.role AS member_role
        FROM projects p
        JOIN project_members m ON m.project_id = p.id
        WHERE m.user_id = ?
        ORDER BY p.name, p.id
        LIMIT ? OFFSET ?
        "#,
        COLUMNS
    ))
    .bind(user_id.to_string())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    rows.iter().map(with_role_from_row).collect()
}

pub async fn count_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM project_members WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(pool)
            .await?;
    Ok(count)
}
