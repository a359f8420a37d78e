//! Deployment database operations

use chrono::{DateTime, Utc};
use serde::Serialize;
use shipyard_common::models::{Deployment, DeploymentStatus};
use shipyard_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{enum_col, opt_ts_col, ts_col, uuid_col};

const COLUMNS: &str = "d.id, d.project_id, d.release_id, d.environment_id, d.status, d.notes, \
                       d.deployed_by, d.created_at, d.started_at, d.finished_at";

/// Release currently running in an environment
#[derive(Debug, Clone, Serialize)]
pub struct CurrentRelease {
    pub deployment_id: Uuid,
    pub release_id: Uuid,
    pub version: String,
    pub deployed_at: DateTime<Utc>,
}

/// Optional list filters
#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentFilter {
    pub environment_id: Option<Uuid>,
    pub release_id: Option<Uuid>,
}

fn from_row(row: &SqliteRow) -> Result<Deployment> {
    Ok(Deployment {
        id: uuid_col(row, "id")?,
        project_id: uuid_col(row, "project_id")?,
        release_id: uuid_col(row, "release_id")?,
        environment_id: uuid_col(row, "environment_id")?,
        status: enum_col(row, "status")?,
        notes: row.try_get("notes")?,
        deployed_by: uuid_col(row, "deployed_by")?,
        created_at: ts_col(row, "created_at")?,
        started_at: opt_ts_col(row, "started_at")?,
        finished_at: opt_ts_col(row, "finished_at")?,
    })
}

pub async fn insert(pool: &SqlitePool, deployment: &Deployment) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO deployments (
            id, project_id, release_id, environment_id, status, notes,
            deployed_by, created_at, started_at, finished_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(deployment.id.to_string())
    .bind(deployment.project_id.to_string())
    .bind(deployment.release_id.to_string())
    .bind(deployment.environment_id.to_string())
    .bind(deployment.status.as_str())
    .bind(&deployment.notes)
    .bind(deployment.deployed_by.to_string())
    .bind(time::to_db(deployment.created_at))
    .bind(deployment.started_at.map(time::to_db))
    .bind(deployment.finished_at.map(time::to_db))
    .execute(pool)
    .await?;

    Ok(())
}

/// Deployment `id` scoped to `project_id`
pub async fn find(pool: &SqlitePool, project_id: Uuid, id: Uuid) -> Result<Option<Deployment>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM deployments d WHERE d.id = ? AND d.project_id = ?",
        COLUMNS
    ))
    .bind(id.to_string())
    .bind(project_id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(from_row).transpose()
}

/// Newest first
pub async fn list(
    pool: &SqlitePool,
    project_id: Uuid,
    filter: DeploymentFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Deployment>> {
    let environment_id = filter.environment_id.map(|id| id.to_string());
    let release_id = filter.release_id.map(|id| id.to_string());
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM deployments d
        WHERE d.project_id = ?
          AND (? IS NULL OR d.environment_id = ?)
          AND (? IS NULL OR d.release_id = ?)
        ORDER BY d.created_at DESC, d.id
        LIMIT ? OFFSET ?
        "#,
        COLUMNS
    ))
    .bind(project_id.to_string())
    .bind(&environment_id)
    .bind(&environment_id)
    .bind(&release_id)
    .bind(&release_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

pub async fn count(pool: &SqlitePool, project_id: Uuid, filter: DeploymentFilter) -> Result<i64> {
    let environment_id = filter.environment_id.map(|id| id.to_string());
    let release_id = filter.release_id.map(|id| id.to_string());
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM deployments
        WHERE project_id = ?
          AND (? IS NULL OR environment_id = ?)
          AND (? IS NULL OR release_id = ?)
        "#,
    )
    .bind(project_id.to_string())
    .bind(&environment_id)
    .bind(&environment_id)
    .bind(&release_id)
    .bind(&release_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Move a deployment from `from` to the status recorded on `deployment`
///
/// The `status = from` guard makes a concurrent transition lose cleanly;
/// returns false when the row had already moved on.
pub async fn update_status(
    pool: &SqlitePool,
    deployment: &Deployment,
    from: DeploymentStatus,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE deployments
        SET status = ?, notes = ?, started_at = ?, finished_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(deployment.status.as_str())
    .bind(&deployment.notes)
    .bind(deployment.started_at.map(time::to_db))
    .bind(deployment.finished_at.map(time::to_db))
    .bind(deployment.id.to_string())
    .bind(from.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Most recent succeeded deployment in an environment
pub async fn current_release(pool: &SqlitePool, environment_id: Uuid) -> Result<Option<CurrentRelease>> {
    let row = sqlx::query(
        r#"
        SELECT d.id AS deployment_id, d.release_id, r.version,
               COALESCE(d.finished_at, d.created_at) AS deployed_at
        FROM deployments d
        JOIN releases r ON r.id = d.release_id
        WHERE d.environment_id = ? AND d.status = 'succeeded'
        ORDER BY deployed_at DESC, d.created_at DESC
        LIMIT 1
        "#,
    )
    .bind(environment_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        Ok(CurrentRelease {
            deployment_id: uuid_col(&row, "deployment_id")?,
            release_id: uuid_col(&row, "release_id")?,
            version: row.try_get("version")?,
            deployed_at: ts_col(&row, "deployed_at")?,
        })
    })
    .transpose()
}
