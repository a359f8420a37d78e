//! Releases
//!
//! A release starts as a Draft; publishing it is one-way. Publishing also
//! pushes a GitHub release and a Slack message when the project has those
//! integrations, but a failing integration never undoes the publish.

use serde::Deserialize;
use shipyard_common::models::{Project, Release, ReleaseStatus, User};
use shipyard_common::validation::{validate_git_tag, validate_version};
use shipyard_common::{time, ProjectRole};
use tracing::{info, warn};
use uuid::Uuid;

use super::projects::viewer_access;
use super::{clean_text, optional_text, patch_optional};
use crate::authz;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::integrations::messages;
use crate::pagination::{Page, PageParams};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReleaseRequest {
    pub version: String,
    /// Defaults to `v<version>`
    pub git_tag: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
}

/// `version` and `git_tag` may only change while the release is a Draft
#[derive(Debug, Default, Deserialize)]
pub struct UpdateReleaseRequest {
    pub version: Option<String>,
    pub git_tag: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
}

fn default_tag(version: &str) -> String {
    format!("v{}", version)
}

pub async fn list_releases(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    status: Option<ReleaseStatus>,
    params: PageParams,
) -> ApiResult<Page<Release>> {
    viewer_access(state, actor, project_id).await?;

    let total = db::releases::count(&state.db, project_id, status).await?;
    let pagination = params.paginate(&state.config.server, total);
    let releases = db::releases::list(
        &state.db,
        project_id,
        status,
        pagination.per_page,
        pagination.offset,
    )
    .await?;

    Ok(Page::new(releases, pagination, total))
}

pub async fn get_release(state: &AppState, actor: &User, project_id: Uuid, release_id: Uuid) -> ApiResult<Release> {
    viewer_access(state, actor, project_id).await?;
    load(state, project_id, release_id).await
}

/// Editor; new releases are Drafts
pub async fn create_release(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    request: CreateReleaseRequest,
) -> ApiResult<Release> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Editor)?;

    let version = validate_version(&request.version)?;
    let git_tag = match request.git_tag.as_deref().map(str::trim) {
        Some(tag) if !tag.is_empty() => validate_git_tag(tag)?,
        _ => default_tag(&version),
    };

    let now = time::now();
    let release = Release {
        id: Uuid::new_v4(),
        project_id,
        version,
        git_tag,
        title: optional_text(request.title, clean_text)?,
        notes: optional_text(request.notes, clean_text)?,
        status: ReleaseStatus::Draft,
        github_release_id: None,
        github_release_url: None,
        created_by: actor.id,
        created_at: now,
        updated_at: now,
        published_at: None,
    };

    db::releases::insert(&state.db, &release)
        .await
        .map_err(|e| version_conflict(e, &release.version))?;
    info!(
        project_id = %project_id,
        release_id = %release.id,
        version = %release.version,
        "Created release"
    );

    Ok(release)
}

/// Editor
pub async fn update_release(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    release_id: Uuid,
    request: UpdateReleaseRequest,
) -> ApiResult<Release> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Editor)?;

    let mut release = load(state, project_id, release_id).await?;

    if (request.version.is_some() || request.git_tag.is_some())
        && release.status != ReleaseStatus::Draft
    {
        return Err(ApiError::Conflict(
            "Version and git tag cannot change after a release is published".to_string(),
        ));
    }

    if let Some(version) = request.version {
        let version = validate_version(&version)?;
        // A tag that followed the old version follows the new one
        if request.git_tag.is_none() && release.git_tag == default_tag(&release.version) {
            release.git_tag = default_tag(&version);
        }
        release.version = version;
    }
    if let Some(tag) = request.git_tag {
        release.git_tag = validate_git_tag(&tag)?;
    }
    patch_optional(&mut release.title, request.title, clean_text)?;
    patch_optional(&mut release.notes, request.notes, clean_text)?;
    release.updated_at = time::now();

    db::releases::update(&state.db, &release)
        .await
        .map_err(|e| version_conflict(e, &release.version))?;

    Ok(release)
}

/// Editor; Draft → Published
pub async fn publish_release(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    release_id: Uuid,
) -> ApiResult<Release> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Editor)?;

    let release = load(state, project_id, release_id).await?;
    if release.status == ReleaseStatus::Published {
        return Err(already_published(&release));
    }

    let now = time::now();
    if !db::releases::mark_published(&state.db, release.id, now).await? {
        return Err(already_published(&release));
    }
    info!(
        project_id = %project_id,
        release_id = %release.id,
        version = %release.version,
        user_id = %actor.id,
        "Published release"
    );

    let mut release = load(state, project_id, release_id).await?;
    let project = access.project;

    if let (Some(repo), Some(github)) = (&project.github_repo, &state.integrations.github) {
        let payload = messages::github_release(&release);
        match github.create_release(repo, &payload).await {
            Ok(created) => {
                db::releases::set_github_release(&state.db, release.id, created.id, &created.html_url, time::now())
                    .await?;
                release.github_release_id = Some(created.id);
                release.github_release_url = Some(created.html_url);
            }
            Err(e) => warn!(
                release_id = %release.id,
                repo = %repo,
                error = %e,
                "GitHub release creation failed; release stays published"
            ),
        }
    }

    notify_published(state, &project, &release, actor).await;

    Ok(release)
}

/// Editor; create the GitHub release for a published release that has none
pub async fn sync_github_release(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    release_id: Uuid,
) -> ApiResult<Release> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Editor)?;

    let mut release = load(state, project_id, release_id).await?;
    let repo = access.project.github_repo.ok_or_else(|| {
        ApiError::Validation("Project has no GitHub repository configured".to_string())
    })?;
    let github = state.integrations.github.as_ref().ok_or_else(|| {
        ApiError::Validation("GitHub integration is not configured".to_string())
    })?;
    if release.status != ReleaseStatus::Published {
        return Err(ApiError::Validation(
            "Only published releases can be synced to GitHub".to_string(),
        ));
    }
    if release.github_release_id.is_some() {
        return Err(ApiError::Conflict(format!(
            "Release {} is already synced to GitHub",
            release.version
        )));
    }

    let created = github
        .create_release(&repo, &messages::github_release(&release))
        .await
        .map_err(|e| {
            warn!(release_id = %release.id, repo = %repo, error = %e, "GitHub sync failed");
            ApiError::Integration(format!("GitHub: {}", e))
        })?;

    let now = time::now();
    db::releases::set_github_release(&state.db, release.id, created.id, &created.html_url, now).await?;
    release.github_release_id = Some(created.id);
    release.github_release_url = Some(created.html_url);
    release.updated_at = now;
    info!(release_id = %release.id, github_release_id = created.id, "Synced release to GitHub");

    Ok(release)
}

/// Owner; refused while deployments reference the release
pub async fn delete_release(state: &AppState, actor: &User, project_id: Uuid, release_id: Uuid) -> ApiResult<()> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Owner)?;

    let release = load(state, project_id, release_id).await?;
    if db::releases::count_deployments(&state.db, release.id).await? > 0 {
        return Err(ApiError::Conflict(format!(
            "Release {} has deployments and cannot be deleted",
            release.version
        )));
    }

    db::releases::delete(&state.db, release.id).await?;
    info!(project_id = %project_id, release_id = %release.id, "Deleted release");

    Ok(())
}

pub(crate) async fn load(state: &AppState, project_id: Uuid, release_id: Uuid) -> ApiResult<Release> {
    db::releases::find(&state.db, project_id, release_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Release {} not found", release_id)))
}

async fn notify_published(state: &AppState, project: &Project, release: &Release, actor: &User) {
    let (Some(webhook), Some(chat)) = (state.integrations.webhook_for(project), &state.integrations.chat)
    else {
        return;
    };

    let message = messages::release_published(project, release, actor);
    if let Err(e) = chat.post_message(&webhook, &message).await {
        warn!(project_id = %project.id, release_id = %release.id, error = %e, "Slack notification failed");
    }
}

fn already_published(release: &Release) -> ApiError {
    ApiError::Conflict(format!("Release {} is already published", release.version))
}

fn version_conflict(err: shipyard_common::Error, version: &str) -> ApiError {
    if err.is_unique_violation() {
        ApiError::Conflict(format!("Version {} already exists in this project", version))
    } else {
        err.into()
    }
}
