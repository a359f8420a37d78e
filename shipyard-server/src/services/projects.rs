//! Projects

use serde::{Deserialize, Serialize};
use shipyard_common::models::{Project, User};
use shipyard_common::validation::{validate_github_repo, validate_name, validate_slug, validate_url};
use shipyard_common::{time, ProjectRole};
use tracing::info;
use uuid::Uuid;

use super::{clean_text, optional_text, patch_optional};
use crate::authz::{self, ProjectAccess};
use crate::db;
use crate::db::projects::ProjectWithRole;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{Page, PageParams};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub github_repo: Option<String>,
    pub slack_webhook_url: Option<String>,
}

/// Absent fields are left unchanged; an empty string clears an optional field
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub github_repo: Option<String>,
    pub slack_webhook_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GitHubTagsResponse {
    pub repo: String,
    pub tags: Vec<String>,
}

/// POST /api/projects
///
/// The creator becomes the project's Owner in the same transaction.
pub async fn create_project(
    state: &AppState,
    actor: &User,
    request: CreateProjectRequest,
) -> ApiResult<ProjectWithRole> {
    let now = time::now();
    let project = Project {
        id: Uuid::new_v4(),
        name: validate_name(&request.name, "name")?,
        slug: validate_slug(&request.slug)?,
        description: optional_text(request.description, clean_text)?,
        github_repo: optional_text(request.github_repo, validate_github_repo)?,
        slack_webhook_url: optional_text(request.slack_webhook_url, validate_url)?,
        created_by: actor.id,
        created_at: now,
        updated_at: now,
    };

    let mut tx = state.db.begin().await?;
    db::projects::insert(&mut *tx, &project).await.map_err(|e| {
        if e.is_unique_violation() {
            ApiError::Conflict(format!("Project slug '{}' is already taken", project.slug))
        } else {
            e.into()
        }
    })?;
    db::members::insert(&mut *tx, project.id, actor.id, ProjectRole::Owner, now).await?;
    tx.commit().await?;

    info!(project_id = %project.id, slug = %project.slug, user_id = %actor.id, "Created project");

    Ok(ProjectWithRole {
        project,
        role: Some(ProjectRole::Owner),
    })
}

/// GET /api/projects
///
/// Admins see every project; everyone else sees the projects they belong to.
pub async fn list_projects(
    state: &AppState,
    actor: &User,
    params: PageParams,
) -> ApiResult<Page<ProjectWithRole>> {
    let (total, pagination, items) = if actor.role.is_admin() {
        let total = db::projects::count_all(&state.db).await?;
        let pagination = params.paginate(&state.config.server, total);
        let items =
            db::projects::list_all(&state.db, actor.id, pagination.per_page, pagination.offset).await?;
        (total, pagination, items)
    } else {
        let total = db::projects::count_for_user(&state.db, actor.id).await?;
        let pagination = params.paginate(&state.config.server, total);
        let items = db::projects::list_for_user(
            &state.db,
            actor.id,
            pagination.per_page,
            pagination.offset,
        )
        .await?;
        (total, pagination, items)
    };

    Ok(Page::new(items, pagination, total))
}

/// GET /api/projects/:id
pub async fn get_project(state: &AppState, actor: &User, project_id: Uuid) -> ApiResult<ProjectWithRole> {
    let access = viewer_access(state, actor, project_id).await?;
    Ok(ProjectWithRole {
        project: access.project,
        role: access.role,
    })
}

/// PATCH /api/projects/:id (Owner)
pub async fn update_project(
    state: &AppState,
    actor: &User,
    project_id: Uuid,
    request: UpdateProjectRequest,
) -> ApiResult<ProjectWithRole> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Owner)?;

    let mut project = access.project;
    if let Some(name) = request.name {
        project.name = validate_name(&name, "name")?;
    }
    patch_optional(&mut project.description, request.description, clean_text)?;
    patch_optional(&mut project.github_repo, request.github_repo, validate_github_repo)?;
    patch_optional(&mut project.slack_webhook_url, request.slack_webhook_url, validate_url)?;
    project.updated_at = time::now();

    db::projects::update(&state.db, &project).await?;
    info!(project_id = %project.id, user_id = %actor.id, "Updated project settings");

    Ok(ProjectWithRole {
        project,
        role: access.role,
    })
}

/// DELETE /api/projects/:id (Owner)
pub async fn delete_project(state: &AppState, actor: &User, project_id: Uuid) -> ApiResult<()> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Owner)?;

    db::projects::delete(&state.db, project_id).await?;
    info!(project_id = %project_id, slug = %access.project.slug, user_id = %actor.id, "Deleted project");

    Ok(())
}

/// GET /api/projects/:id/github/tags (Editor)
pub async fn github_tags(state: &AppState, actor: &User, project_id: Uuid) -> ApiResult<GitHubTagsResponse> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Editor)?;

    let repo = access.project.github_repo.ok_or_else(|| {
        ApiError::Validation("Project has no GitHub repository configured".to_string())
    })?;
    let github = state.integrations.github.as_ref().ok_or_else(|| {
        ApiError::Validation("GitHub integration is not configured".to_string())
    })?;

    let tags = github.list_tags(&repo).await?;
    Ok(GitHubTagsResponse { repo, tags })
}

/// Project access for read operations
pub(crate) async fn viewer_access(state: &AppState, actor: &User, project_id: Uuid) -> ApiResult<ProjectAccess> {
    let access = authz::project_access(&state.db, actor, project_id).await?;
    access.require(ProjectRole::Viewer)?;
    Ok(access)
}
