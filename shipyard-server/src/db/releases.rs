//! Release database operations

use chrono::{DateTime, Utc};
use shipyard_common::models::{Release, ReleaseStatus};
use shipyard_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{enum_col, opt_ts_col, ts_col, uuid_col};

const COLUMNS: &str = "id, project_id, version, git_tag, title, notes, status, \
                       github_release_id, github_release_url, created_by, \
                       created_at, updated_at, published_at";

fn from_row(row: &SqliteRow) -> Result<Release> {
    Ok(Release {
        id: uuid_col(row, "id")?,
        project_id: uuid_col(row, "project_id")?,
        version: row.try_get("version")?,
        git_tag: row.try_get("git_tag")?,
        title: row.try_get("title")?,
        notes: row.try_get("notes")?,
        status: enum_col(row, "status")?,
        github_release_id: row.try_get("github_release_id")?,
        github_release_url: row.try_get("github_release_url")?,
        created_by: uuid_col(row, "created_by")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
        published_at: opt_ts_col(row, "published_at")?,
    })
}

pub async fn insert(pool: &SqlitePool, release: &Release) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO releases (
            id, project_id, version, git_tag, title, notes, status,
            github_release_id, github_release_url, created_by,
            created_at, updated_at, published_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(release.id.to_string())
    .bind(release.project_id.to_string())
    .bind(&release.version)
    .bind(&release.git_tag)
    .bind(&release.title)
    .bind(&release.notes)
    .bind(release.status.as_str())
    .bind(release.github_release_id)
    .bind(&release.github_release_url)
    .bind(release.created_by.to_string())
    .bind(time::to_db(release.created_at))
    .bind(time::to_db(release.updated_at))
    .bind(release.published_at.map(time::to_db))
    .execute(pool)
    .await?;

    Ok(())
}

/// Release `id` scoped to `project_id`
pub async fn find(pool: &SqlitePool, project_id: Uuid, id: Uuid) -> Result<Option<Release>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM releases WHERE id = ? AND project_id = ?",
        COLUMNS
    ))
    .bind(id.to_string())
    .bind(project_id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(from_row).transpose()
}

/// Newest first, optionally narrowed to one status
pub async fn list(
    pool: &SqlitePool,
    project_id: Uuid,
    status: Option<ReleaseStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Release>> {
    let status = status.map(|s| s.as_str());
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM releases
        WHERE project_id = ? AND (? IS NULL OR status = ?)
        ORDER BY created_at DESC, id
        LIMIT ? OFFSET ?
        "#,
        COLUMNS
    ))
    .bind(project_id.to_string())
    .bind(status)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

pub async fn count(pool: &SqlitePool, project_id: Uuid, status: Option<ReleaseStatus>) -> Result<i64> {
    let status = status.map(|s| s.as_str());
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM releases WHERE project_id = ? AND (? IS NULL OR status = ?)",
    )
    .bind(project_id.to_string())
    .bind(status)
    .bind(status)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Write back the editable fields and status
pub async fn update(pool: &SqlitePool, release: &Release) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE releases
        SET version = ?, git_tag = ?, title = ?, notes = ?, status = ?,
            updated_at = ?, published_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&release.version)
    .bind(&release.git_tag)
    .bind(&release.title)
    .bind(&release.notes)
    .bind(release.status.as_str())
    .bind(time::to_db(release.updated_at))
    .bind(release.published_at.map(time::to_db))
    .bind(release.id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Flip a Draft release to Published
///
/// Returns false when the release was no longer a draft, so two concurrent
/// publishes cannot both succeed.
pub async fn mark_published(pool: &SqlitePool, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE releases
        SET status = 'published', published_at = ?, updated_at = ?
        WHERE id = ? AND status = 'draft'
        "#,
    )
    .bind(time::to_db(at))
    .bind(time::to_db(at))
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_github_release(
    pool: &SqlitePool,
    id: Uuid,
    github_id: i64,
    url: &str,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE releases SET github_release_id = ?, github_release_url = ?, updated_at = ? WHERE id = ?",
    )
    .bind(github_id)
    .bind(url)
    .bind(time::to_db(at))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM releases WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_deployments(pool: &SqlitePool, id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deployments WHERE release_id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}
