//! Message formatting for notifications and emails

use shipyard_common::models::{Deployment, DeploymentStatus, Environment, Invitation, Project, Release, User};

use super::{CreateGitHubRelease, EmailMessage, SlackMessage};

pub fn release_published(project: &Project, release: &Release, actor: &User) -> SlackMessage {
    let mut text = format!(
        ":rocket: *{}* {} published by {}",
        project.name, release.version, actor.display_name
    );
    if let Some(title) = &release.title {
        text.push_str(&format!(": {}", title));
    }
    if let Some(url) = &release.github_release_url {
        text.push_str(&format!("\n<{}|View on GitHub>", url));
    }
    SlackMessage { text }
}

pub fn deployment_finished(
    project: &Project,
    environment: &Environment,
    release: &Release,
    deployment: &Deployment,
) -> SlackMessage {
    let (emoji, verb) = match deployment.status {
        DeploymentStatus::Succeeded => (":white_check_mark:", "deployed to"),
        DeploymentStatus::Failed => (":x:", "failed to deploy to"),
        DeploymentStatus::RolledBack => (":rewind:", "rolled back on"),
        DeploymentStatus::Pending | DeploymentStatus::InProgress => (":hourglass:", "deploying to"),
    };
    let mut text = format!(
        "{} *{}* {} {} *{}*",
        emoji, project.name, release.version, verb, environment.name
    );
    if let Some(url) = &environment.service_url {
        text.push_str(&format!(" (<{}|{}>)", url, url));
    }
    SlackMessage { text }
}

/// GitHub release payload for a Shipyard release
pub fn github_release(release: &Release) -> CreateGitHubRelease {
    CreateGitHubRelease {
        tag_name: release.git_tag.clone(),
        name: release
            .title
            .clone()
            .unwrap_or_else(|| release.version.clone()),
        body: release.notes.clone().unwrap_or_default(),
        draft: false,
        prerelease: release.version.contains('-'),
    }
}

pub fn invitation_email(
    from: &str,
    project: &Project,
    inviter: &User,
    invitation: &Invitation,
    accept_url: &str,
) -> EmailMessage {
    let subject = format!(
        "{} invited you to {} on Shipyard",
        inviter.display_name, project.name
    );
    let expires = invitation.expires_at.format("%Y-%m-%d %H:%M UTC");
    let text = format!(
        "{} ({}) invited you to join {} as {}.\n\nAccept the invitation: {}\n\nThis link expires {}.",
        inviter.display_name, inviter.email, project.name, invitation.role, accept_url, expires
    );
    let html = format!(
        "<p><strong>{}</strong> ({}) invited you to join <strong>{}</strong> as {}.</p>\
         <p><a href=\"{}\">Accept the invitation</a></p>\
         <p>This link expires {}.</p>",
        escape_html(&inviter.display_name),
        escape_html(&inviter.email),
        escape_html(&project.name),
        invitation.role,
        escape_html(accept_url),
        expires
    );

    EmailMessage {
        from: from.to_string(),
        to: vec![invitation.email.clone()],
        subject,
        text,
        html,
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shipyard_common::models::{InvitationStatus, ReleaseStatus};
    use shipyard_common::{ProjectRole, UserRole};
    use uuid::Uuid;

    fn project() -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            name: "Billing <API>".into(),
            slug: "billing".into(),
            description: None,
            github_repo: Some("acme/billing".into()),
            slack_webhook_url: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            auth_subject: "sub".into(),
            email: "ada@example.com".into(),
            display_name: "Ada".into(),
            role: UserRole::User,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    fn release(version: &str) -> Release {
        let now = Utc::now();
        Release {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            version: version.into(),
            git_tag: format!("v{}", version),
            title: None,
            notes: Some("Fixes".into()),
            status: ReleaseStatus::Published,
            github_release_id: None,
            github_release_url: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            published_at: Some(now),
        }
    }

    #[test]
    fn test_github_payload_flags_prerelease() {
        let payload = github_release(&release("2.0.0-rc.1"));
        assert!(payload.prerelease);
        assert_eq!(payload.tag_name, "v2.0.0-rc.1");
        assert_eq!(payload.name, "2.0.0-rc.1");
        assert_eq!(payload.body, "Fixes");

        assert!(!github_release(&release("2.0.0")).prerelease);
    }

    #[test]
    fn test_release_published_text() {
        let message = release_published(&project(), &release("1.4.0"), &user());
        assert!(message.text.contains("1.4.0"));
        assert!(message.text.contains("Ada"));
    }

    #[test]
    fn test_invitation_email_escapes_html() {
        let invitation = Invitation {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            email: "bob@example.com".into(),
            role: ProjectRole::Editor,
            token_hash: String::new(),
            status: InvitationStatus::Pending,
            invited_by: Uuid::new_v4(),
            created_at: Utc::now(),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 0).unwrap(),
            responded_at: None,
            accepted_by: None,
        };
        let email = invitation_email(
            "Shipyard <noreply@example.com>",
            &project(),
            &user(),
            &invitation,
            "https://ship.example.com/invitations/accept?token=abc",
        );

        assert_eq!(email.to, vec!["bob@example.com".to_string()]);
        assert!(email.subject.contains("Billing <API>"));
        assert!(email.html.contains("Billing &lt;API&gt;"));
        assert!(email.text.contains("token=abc"));
        assert!(email.text.contains("2030-01-02 03:04 UTC"));
        assert!(email.text.contains("editor"));
    }
}
