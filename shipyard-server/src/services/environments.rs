//! Environments (deployment targets)

use serde::{Deserialize, Serialize};
use shipyard_common::models::{Environment, User};
use shipyard_common::validation::{validate_slug, validate_url};
use shipyard_common::{time, ProjectRole};
use tracing::info;
use uuid::Uuid;

use super::projects::viewer_access;
use super::{optional_text, patch_optional};
use crate::authz;
use crate::db;
use crate::db::deployments::CurrentRelease;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEnvironmentRequest {
    pub name: String,
    pub service_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEnvironmentRequest {
    pub name: Option<String>,
    /// Empty string clears the URL
    pub service_url: Option<String>,
}

/// Environment with the release it is currently running
#[derive(Debug, Serialize)]
pub struct EnvironmentView {
    #[serde(flatten)]
    pub environment: Environment,
    pub current_release: Option<CurrentRelease>,
}

pub async fn list_environments(state: &AppState, actor: &User, project_id: Uuid) -> ApiResult<Vec<EnvironmentView>> {
    viewer_access(state, actor, project_id).await?;

    let environments = db::environments::list(&state.db, project_id).await?;
    let mut views = Vec::with_capacity(environments.len());
    for environment in environments {
        views.push(with_current_release(state, environment).await?);
    }
    Ok(views)
}

pub async fn get_environment(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    environment_id: Uuid,
) -> ApiResult<EnvironmentView> {
    viewer_access(state, actor, project_id).await?;

    let environment = load(state, project_id, environment_id).await?;
    with_current_release(state, environment).await
}

/// Editor
pub async fn create_environment(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    request: CreateEnvironmentRequest,
) -> ApiResult<Environment> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Editor)?;

    let now = time::now();
    let environment = Environment {
        id: Uuid::new_v4(),
        project_id,
        name: validate_slug(&request.name)?,
        service_url: optional_text(request.service_url, validate_url)?,
        created_at: now,
        updated_at: now,
    };

    db::environments::insert(&state.db, &environment)
        .await
        .map_err(|e| name_conflict(e, &environment.name))?;
    info!(
        project_id = %project_id,
        environment_id = %environment.id,
        name = %environment.name,
        "Created environment"
    );

    Ok(environment)
}

/// Editor
pub async fn update_environment(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    environment_id: Uuid,
    request: UpdateEnvironmentRequest,
) -> ApiResult<Environment> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Editor)?;

    let mut environment = load(state, project_id, environment_id).await?;
    if let Some(name) = request.name {
        environment.name = validate_slug(&name)?;
    }
    patch_optional(&mut environment.service_url, request.service_url, validate_url)?;
    environment.updated_at = time::now();

    db::environments::update(&state.db, &environment)
        .await
        .map_err(|e| name_conflict(e, &environment.name))?;

    Ok(environment)
}

/// Owner; refused while a deployment to the environment is in progress
pub async fn delete_environment(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    environment_id: Uuid,
) -> ApiResult<()> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Owner)?;

    let environment = load(state, project_id, environment_id).await?;
    if db::environments::count_in_progress_deployments(&state.db, environment.id).await? > 0 {
        return Err(ApiError::Conflict(format!(
            "Environment '{}' has a deployment in progress",
            environment.name
        )));
    }

    db::environments::delete(&state.db, environment.id).await?;
    info!(project_id = %project_id, environment_id = %environment.id, "Deleted environment");

    Ok(())
}

pub(crate) async fn load(state: &AppState, project_id: Uuid, environment_id: Uuid) -> ApiResult<Environment> {
    db::environments::find(&state.db, project_id, environment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Environment {} not found", environment_id)))
}

async fn with_current_release(state: &AppState, environment: Environment) -> ApiResult<EnvironmentView> {
    let current_release = db::deployments::current_release(&state.db, environment.id).await?;
    Ok(EnvironmentView {
        environment,
        current_release,
    })
}

fn name_conflict(err: shipyard_common::Error, name: &str) -> ApiError {
    if err.is_unique_violation() {
        ApiError::Conflict(format!("Environment '{}' already exists in this project", name))
    } else {
        err.into()
    }
}
