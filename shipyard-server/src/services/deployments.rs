//! Deployments
//!
//! Status moves along `DeploymentStatus::can_transition_to`; anything else is
//! a conflict. Finished deployments notify the project's Slack channel.

use serde::Deserialize;
use shipyard_common::models::{Deployment, DeploymentStatus, Project, ReleaseStatus, User};
use shipyard_common::{time, ProjectRole};
use tracing::{info, warn};
use uuid::Uuid;

use super::projects::viewer_access;
use super::{clean_text, optional_text, patch_optional};
use crate::authz;
use crate::db;
use crate::db::deployments::DeploymentFilter;
use crate::error::{ApiError, ApiResult};
use crate::integrations::messages;
use crate::pagination::{Page, PageParams};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateDeploymentRequest {
    pub release_id: Uuid,
    pub environment_id: Uuid,
    /// Record an already started or finished deploy; defaults to Pending
    pub status: Option<DeploymentStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDeploymentStatusRequest {
    pub status: DeploymentStatus,
    pub notes: Option<String>,
}

pub async fn list_deployments(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    filter: DeploymentFilter,
    params: PageParams,
) -> ApiResult<Page<Deployment>> {
    viewer_access(state, actor, project_id).await?;

    let total = db::deployments::count(&state.db, project_id, filter).await?;
    let pagination = params.paginate(&state.config.server, total);
    let deployments = db::deployments::list(
        &state.db,
        project_id,
        filter,
        pagination.per_page,
        pagination.offset,
    )
    .await?;

    Ok(Page::new(deployments, pagination, total))
}

pub async fn get_deployment(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    deployment_id: Uuid,
) -> ApiResult<Deployment> {
    viewer_access(state, actor, project_id).await?;
    load(state, project_id, deployment_id).await
}

/// Editor
///
/// The release and environment must both belong to the project, and only
/// published releases can be deployed.
pub async fn create_deployment(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    request: CreateDeploymentRequest,
) -> ApiResult<Deployment> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Editor)?;

    let release = db::releases::find(&state.db, project_id, request.release_id)
        .await?
        .ok_or_else(|| {
            ApiError::Validation(format!(
                "Release {} does not belong to this project",
                request.release_id
            ))
        })?;
    let environment = db::environments::find(&state.db, project_id, request.environment_id)
        .await?
        .ok_or_else(|| {
            ApiError::Validation(format!(
                "Environment {} does not belong to this project",
                request.environment_id
            ))
        })?;
    if release.status != ReleaseStatus::Published {
        return Err(ApiError::Validation(format!(
            "Release {} must be published before it can be deployed",
            release.version
        )));
    }

    let status = request.status.unwrap_or(DeploymentStatus::Pending);
    if status == DeploymentStatus::RolledBack {
        return Err(ApiError::Validation(
            "A deployment cannot start out rolled back".to_string(),
        ));
    }

    let now = time::now();
    let mut deployment = Deployment {
        id: Uuid::new_v4(),
        project_id,
        release_id: release.id,
        environment_id: environment.id,
        status: DeploymentStatus::Pending,
        notes: optional_text(request.notes, clean_text)?,
        deployed_by: actor.id,
        created_at: now,
        started_at: None,
        finished_at: None,
    };
    stamp_status(&mut deployment, status, now);

    db::deployments::insert(&state.db, &deployment).await?;
    info!(
        project_id = %project_id,
        deployment_id = %deployment.id,
        version = %release.version,
        environment = %environment.name,
        status = %deployment.status,
        "Recorded deployment"
    );

    if deployment.status.is_terminal() {
        notify_finished(state, &access.project, &deployment).await;
    }

    Ok(deployment)
}

/// Editor
pub async fn update_deployment_status(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    deployment_id: Uuid,
    request: UpdateDeploymentStatusRequest,
) -> ApiResult<Deployment> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Editor)?;

    let mut deployment = load(state, project_id, deployment_id).await?;
    let from = deployment.status;
    if !from.can_transition_to(request.status) {
        return Err(invalid_transition(from, request.status));
    }

    stamp_status(&mut deployment, request.status, time::now());
    patch_optional(&mut deployment.notes, request.notes, clean_text)?;

    if !db::deployments::update_status(&state.db, &deployment, from).await? {
        let current = load(state, project_id, deployment_id).await?;
        return Err(invalid_transition(current.status, request.status));
    }
    info!(
        deployment_id = %deployment.id,
        from = %from,
        to = %deployment.status,
        user_id = %actor.id,
        "Deployment status changed"
    );

    if deployment.status.is_terminal() {
        notify_finished(state, &access.project, &deployment).await;
    }

    Ok(deployment)
}

/// Set `status` and the timestamps that go with it
fn stamp_status(deployment: &mut Deployment, status: DeploymentStatus, now: chrono::DateTime<chrono::Utc>) {
    deployment.status = status;
    match status {
        DeploymentStatus::Pending => {}
        DeploymentStatus::InProgress => deployment.started_at = Some(now),
        DeploymentStatus::Succeeded | DeploymentStatus::Failed => {
            deployment.started_at.get_or_insert(now);
            deployment.finished_at = Some(now);
        }
        // Keeps the original finish time of the deploy being undone
        DeploymentStatus::RolledBack => {
            deployment.finished_at.get_or_insert(now);
        }
    }
}

fn invalid_transition(from: DeploymentStatus, to: DeploymentStatus) -> ApiError {
    ApiError::Conflict(format!("Cannot move a deployment from {} to {}", from, to))
}

async fn load(state: &AppState, project_id: Uuid, deployment_id: Uuid) -> ApiResult<Deployment> {
    db::deployments::find(&state.db, project_id, deployment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Deployment {} not found", deployment_id)))
}

async fn notify_finished(state: &AppState, project: &Project, deployment: &Deployment) {
    let (Some(webhook), Some(chat)) = (state.integrations.webhook_for(project), &state.integrations.chat)
    else {
        return;
    };

    let environment = db::environments::find(&state.db, project.id, deployment.environment_id).await;
    let release = db::releases::find(&state.db, project.id, deployment.release_id).await;
    let (Ok(Some(environment)), Ok(Some(release))) = (environment, release) else {
        warn!(deployment_id = %deployment.id, "Skipping Slack notification; deployment context unavailable");
        return;
    };

    let message = messages::deployment_finished(project, &environment, &release, deployment);
    if let Err(e) = chat.post_message(&webhook, &message).await {
        warn!(project_id = %project.id, deployment_id = %deployment.id, error = %e, "Slack notification failed");
    }
}
