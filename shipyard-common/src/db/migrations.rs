//! Database schema migrations
//!
//! Tables are created with `CREATE TABLE IF NOT EXISTS` in [`super::init`];
//! anything that changes an existing table goes here as a numbered migration.
//!
//! Rules:
//! 1. Never modify an existing migration, add a new one
//! 2. Every migration is idempotent (checks before it alters)
//! 3. Bump [`CURRENT_SCHEMA_VERSION`] with each new migration

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::Result;

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Latest applied version, 0 for a fresh database
pub async fn current_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = current_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: lookup indexes for the hot listing queries
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
        "CREATE INDEX IF NOT EXISTS idx_members_user ON project_members(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_releases_project_created ON releases(project_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_deployments_environment ON deployments(environment_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_deployments_release ON deployments(release_id)",
        "CREATE INDEX IF NOT EXISTS idx_invitations_project_email ON invitations(project_id, email)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// Migration v2: track last login on users
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('users') WHERE name = 'last_login_at'",
    )
    .fetch_one(pool)
    .await?;

    if has_column > 0 {
        info!("  users.last_login_at already exists - skipping");
        return Ok(());
    }

    sqlx::query("ALTER TABLE users ADD COLUMN last_login_at TEXT")
        .execute(pool)
        .await?;

    info!("  Added last_login_at column to users table");
    Ok(())
}
