//! Service layer
//!
//! Services own authorization and domain rules. Handlers parse the request,
//! call one service function with the [`crate::auth::CurrentUser`] and return
//! what it produces; repositories never see an unauthorized request.

pub mod deployments;
pub mod environments;
pub mod invitations;
pub mod members;
pub mod projects;
pub mod releases;
pub mod users;

use crate::error::ApiResult;

/// Apply a PATCH value to an optional text field
///
/// `None` leaves the field alone, an empty (or blank) string clears it, and
/// anything else is normalized by `validate` and stored.
pub(crate) fn patch_optional<F>(
    target: &mut Option<String>,
    update: Option<String>,
    validate: F,
) -> ApiResult<()>
where
    F: Fn(&str) -> shipyard_common::Result<String>,
{
    match update {
        None => {}
        Some(value) if value.trim().is_empty() => *target = None,
        Some(value) => *target = Some(validate(&value)?),
    }
    Ok(())
}

/// Trimmed free text
pub(crate) fn clean_text(value: &str) -> shipyard_common::Result<String> {
    Ok(value.trim().to_string())
}

/// Optional text on create: blank means absent
pub(crate) fn optional_text<F>(value: Option<String>, validate: F) -> ApiResult<Option<String>>
where
    F: Fn(&str) -> shipyard_common::Result<String>,
{
    let mut target = None;
    patch_optional(&mut target, value, validate)?;
    Ok(target)
}
