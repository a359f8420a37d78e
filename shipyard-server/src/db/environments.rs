//! Environment database operations

use shipyard_common::models::Environment;
use shipyard_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{ts_col, uuid_col};

const COLUMNS: &str = "id, project_id, name, service_url, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<Environment> {
    Ok(Environment {
        id: uuid_col(row, "id")?,
        project_id: uuid_col(row, "project_id")?,
        name: row.try_get("name")?,
        service_url: row.try_get("service_url")?,
        created_at: ts_col(row, "created_at")?,
        updated_at: ts_col(row, "updated_at")?,
    })
}

pub async fn insert(pool: &SqlitePool, env: &Environment) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO environments (id, project_id, name, service_url, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(env.id.to_string())
    .bind(env.project_id.to_string())
    .bind(&env.name)
    .bind(&env.service_url)
    .bind(time::to_db(env.created_at))
    .bind(time::to_db(env.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Environment `id` scoped to `project_id`
pub async fn find(pool: &SqlitePool, project_id: Uuid, id: Uuid) -> Result<Option<Environment>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM environments WHERE id = ? AND project_id = ?",
        COLUMNS
    ))
    .bind(id.to_string())
    .bind(project_id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn list(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<Environment>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM environments WHERE project_id = ? ORDER BY name",
        COLUMNS
    ))
    .bind(project_id.to_string())
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

pub async fn update(pool: &SqlitePool, env: &Environment) -> Result<()> {
    sqlx::query("UPDATE environments SET name = ?, service_url = ?, updated_at = ? WHERE id = ?")
        .bind(&env.name)
        .bind(&env.service_url)
        .bind(time::to_db(env.updated_at))
        .bind(env.id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM environments WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_in_progress_deployments(pool: &SqlitePool, id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM deployments WHERE environment_id = ? AND status = 'in_progress'",
    )
    .bind(id.to_string())
    .fetch_one(pool)
    .await?;
    Ok(count)
}
