//! Role hierarchy
//!
//! Two independent axes:
//! - [`UserRole`] is global (admin/user)
//! - [`ProjectRole`] is scoped to one project (owner/editor/viewer)
//!
//! Project roles are totally ordered: owner > editor > viewer. A check for a
//! minimum role passes for that role and every role above it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Global user role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            other => Err(Error::InvalidInput(format!("Unknown user role: {}", other))),
        }
    }
}

/// Project-scoped role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Owner,
    Editor,
    Viewer,
}

impl ProjectRole {
    /// Position in the hierarchy; higher outranks lower
    pub fn rank(&self) -> u8 {
        match self {
            ProjectRole::Owner => 3,
            ProjectRole::Editor => 2,
            ProjectRole::Viewer => 1,
        }
    }

    /// True when this role is at least `required`
    pub fn satisfies(&self, required: ProjectRole) -> bool {
        self.rank() >= required.rank()
    }

    /// Only owners add, remove, re-role members and manage invitations
    pub fn can_manage_members(&self) -> bool {
        matches!(self, ProjectRole::Owner)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Owner => "owner",
            ProjectRole::Editor => "editor",
            ProjectRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(ProjectRole::Owner),
            "editor" => Ok(ProjectRole::Editor),
            "viewer" => Ok(ProjectRole::Viewer),
            other => Err(Error::InvalidInput(format!("Unknown project role: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_ordering() {
        assert!(ProjectRole::Owner.rank() > ProjectRole::Editor.rank());
        assert!(ProjectRole::Editor.rank() > ProjectRole::Viewer.rank());
    }

    #[test]
    fn test_satisfies_is_inclusive() {
        assert!(ProjectRole::Owner.satisfies(ProjectRole::Owner));
        assert!(ProjectRole::Owner.satisfies(ProjectRole::Viewer));
        assert!(ProjectRole::Editor.satisfies(ProjectRole::Editor));
        assert!(ProjectRole::Editor.satisfies(ProjectRole::Viewer));
        assert!(!ProjectRole::Editor.satisfies(ProjectRole::Owner));
        assert!(!ProjectRole::Viewer.satisfies(ProjectRole::Editor));
    }

    #[test]
    fn test_only_owner_manages_members() {
        assert!(ProjectRole::Owner.can_manage_members());
        assert!(!ProjectRole::Editor.can_manage_members());
        assert!(!ProjectRole::Viewer.can_manage_members());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Owner".parse::<ProjectRole>().unwrap(), ProjectRole::Owner);
        assert_eq!(" viewer ".parse::<ProjectRole>().unwrap(), ProjectRole::Viewer);
        assert_eq!("ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("maintainer".parse::<ProjectRole>().is_err());
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&ProjectRole::Editor).unwrap(), "\"editor\"");
        let role: UserRole = serde_json::from_str("\"admin\"").unwrap();
        assert!(role.is_admin());
    }
}
