//! Authorization
//!
//! Every project-scoped service call starts with [`project_access`], then
//! asks the returned [`ProjectAccess`] for the minimum role the operation
//! needs. Callers who are not members (and not admins) get `NotFound`, so a
//! project's existence is never revealed to outsiders; members whose role is
//! too low get `Forbidden`.

use shipyard_common::models::{Project, User};
use shipyard_common::ProjectRole;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::error::{ApiError, ApiResult};

/// Outcome of a role check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Caller cannot see the project at all (404)
    Hidden,
    /// Caller can see the project but lacks the role (403)
    Forbidden,
}

/// Decide whether a caller with `role` (None = not a member) may perform an
/// operation that needs `required`
pub fn decide(role: Option<ProjectRole>, is_admin: bool, required: ProjectRole) -> Decision {
    if is_admin {
        return Decision::Allow;
    }
    match role {
        None => Decision::Hidden,
        Some(role) if role.satisfies(required) => Decision::Allow,
        Some(_) => Decision::Forbidden,
    }
}

/// The caller's standing in one project
#[derive(Debug, Clone)]
pub struct ProjectAccess {
    pub project: Project,
    /// Membership role; `None` for admins acting on projects they are not in
    pub role: Option<ProjectRole>,
    pub is_admin: bool,
}

impl ProjectAccess {
    /// Require at least `required`; admins always pass
    pub fn require(&self, required: ProjectRole) -> ApiResult<()> {
        match decide(self.role, self.is_admin, required) {
            Decision::Allow => Ok(()),
            Decision::Hidden => Err(project_not_found(self.project.id)),
            Decision::Forbidden => Err(ApiError::Forbidden(format!(
                "This action requires the {} role",
                required
            ))),
        }
    }

    /// Adding, re-roling and removing members, and managing invitations
    ///
    /// Any member may see the project; only roles that can manage members
    /// (Owners, and admins acting as Owner) pass.
    pub fn require_member_management(&self) -> ApiResult<()> {
        self.require(ProjectRole::Viewer)?;
        if self.effective_role().can_manage_members() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Only owners manage members".to_string()))
        }
    }

    /// Role the caller acts with: admins act as Owner
    pub fn effective_role(&self) -> ProjectRole {
        if self.is_admin {
            ProjectRole::Owner
        } else {
            self.role.unwrap_or(ProjectRole::Viewer)
        }
    }

    pub fn project_id(&self) -> Uuid {
        self.project.id
    }
}

/// Forbidden unless the caller is a global admin
pub fn require_admin(user: &User) -> ApiResult<()> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Administrator role required".to_string()))
    }
}

/// Load a project together with the caller's role in it
///
/// Missing projects and projects the caller cannot see are both `NotFound`.
pub async fn project_access(pool: &SqlitePool, user: &User, project_id: Uuid) -> ApiResult<ProjectAccess> {
    let project = db::projects::find(pool, project_id)
        .await?
        .ok_or_else(|| project_not_found(project_id))?;

    let role = db::members::find_role(pool, project_id, user.id).await?;
    let is_admin = user.role.is_admin();

    if role.is_none() && !is_admin {
        return Err(project_not_found(project_id));
    }

    Ok(ProjectAccess {
        project,
        role,
        is_admin,
    })
}

fn project_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Project {} not found", id))
}
