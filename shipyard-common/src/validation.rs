//! Input validation
//!
//! Validators return the normalized value on success so callers store exactly
//! what was checked.

use crate::{Error, Result};

const MAX_SLUG_LEN: usize = 64;
const MAX_NAME_LEN: usize = 200;
const MAX_TAG_LEN: usize = 255;

/// Lowercase ASCII alphanumerics and `-`, no leading/trailing `-`
pub fn validate_slug(value: &str) -> Result<String> {
    let slug = value.trim();
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        return Err(Error::InvalidInput(format!(
            "Slug must be 1-{} characters",
            MAX_SLUG_LEN
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(Error::InvalidInput(format!(
            "Slug '{}' may only contain lowercase letters, digits and '-'",
            slug
        )));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(Error::InvalidInput(format!(
            "Slug '{}' must not start or end with '-'",
            slug
        )));
    }
    Ok(slug.to_string())
}

/// Trimmed, non-empty, bounded display name
pub fn validate_name(value: &str, field: &str) -> Result<String> {
    let name = value.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Returns the lowercased address
pub fn validate_email(value: &str) -> Result<String> {
    let email = value.trim().to_ascii_lowercase();
    let invalid = || Error::InvalidInput(format!("Invalid email address: {}", value.trim()));

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(email)
}

/// Semantic version `MAJOR.MINOR.PATCH[-pre][+build]`; a leading `v` is stripped
pub fn validate_version(value: &str) -> Result<String> {
    let trimmed = value.trim();
    let version = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let invalid = || {
        Error::InvalidInput(format!(
            "Version '{}' is not MAJOR.MINOR.PATCH[-pre][+build]",
            trimmed
        ))
    };

    let (rest, build) = match version.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (version, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() != 3 {
        return Err(invalid());
    }
    for part in parts {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        // No leading zeros on numeric identifiers
        if part.len() > 1 && part.starts_with('0') {
            return Err(invalid());
        }
    }

    let ident_ok = |s: &str| {
        !s.is_empty()
            && s.split('.').all(|id| {
                !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            })
    };
    if let Some(pre) = pre {
        if !ident_ok(pre) {
            return Err(invalid());
        }
    }
    if let Some(build) = build {
        if !ident_ok(build) {
            return Err(invalid());
        }
    }

    Ok(version.to_string())
}

/// Subset of git's ref-name rules that matters for tags created by users
pub fn validate_git_tag(value: &str) -> Result<String> {
    let tag = value.trim();
    let invalid = |why: &str| Error::InvalidInput(format!("Invalid git tag '{}': {}", tag, why));

    if tag.is_empty() {
        return Err(invalid("empty"));
    }
    if tag.len() > MAX_TAG_LEN {
        return Err(invalid("too long"));
    }
    if tag.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("contains whitespace"));
    }
    if tag.contains("..") {
        return Err(invalid("contains '..'"));
    }
    if tag.starts_with('-') {
        return Err(invalid("starts with '-'"));
    }
    if tag.ends_with(".lock") || tag.ends_with('/') || tag.ends_with('.') {
        return Err(invalid("bad suffix"));
    }
    if tag.chars().any(|c| matches!(c, '~' | '^' | ':' | '?' | '*' | '[' | '\\')) {
        return Err(invalid("contains a reserved character"));
    }
    Ok(tag.to_string())
}

/// `http://` or `https://` URL with a non-empty host
pub fn validate_url(value: &str) -> Result<String> {
    let url = value.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| Error::InvalidInput(format!("URL must use http or https: {}", url)))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(Error::InvalidInput(format!("Invalid URL: {}", url)));
    }
    Ok(url.to_string())
}

/// `owner/repo`
pub fn validate_github_repo(value: &str) -> Result<String> {
    let repo = value.trim();
    let valid_part = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    match repo.split_once('/') {
        Some((owner, name)) if valid_part(owner) && valid_part(name) => Ok(repo.to_string()),
        _ => Err(Error::InvalidInput(format!(
            "GitHub repository must be 'owner/repo': {}",
            repo
        ))),
    }
}
