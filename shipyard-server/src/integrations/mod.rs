//! Third-party integrations
//!
//! Thin HTTP clients for GitHub, Slack incoming webhooks and an HTTP email
//! API. Services only see the traits below, so tests can swap in fakes.
//!
//! Each integration is optional: a missing token/key disables it and the
//! corresponding side effects are skipped.

pub mod email;
pub mod github;
pub mod messages;
pub mod slack;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use shipyard_common::config::ServerConfig;
use shipyard_common::models::Project;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub use email::HttpMailer;
pub use github::GitHubClient;
pub use slack::SlackClient;

pub(crate) const USER_AGENT: &str = concat!("shipyard/", env!("CARGO_PKG_VERSION"));
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Integration client errors
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Credentials rejected: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected by remote: {0}")]
    Validation(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Map a non-success HTTP status to an error
pub(crate) fn translate_status(status: StatusCode, body: String) -> IntegrationError {
    match status.as_u16() {
        401 | 403 => IntegrationError::Unauthorized(body),
        404 => IntegrationError::NotFound(body),
        422 => IntegrationError::Validation(body),
        code => IntegrationError::Api(code, body),
    }
}

pub(crate) fn http_client() -> Result<reqwest::Client, IntegrationError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| IntegrationError::Network(e.to_string()))
}

// ========================================
// GitHub
// ========================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateGitHubRelease {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub id: i64,
    pub html_url: String,
    pub tag_name: String,
}

#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn create_release(
        &self,
        repo: &str,
        release: &CreateGitHubRelease,
    ) -> Result<GitHubRelease, IntegrationError>;

    async fn list_tags(&self, repo: &str) -> Result<Vec<String>, IntegrationError>;
}

// ========================================
// Slack
// ========================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlackMessage {
    pub text: String,
}

#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn post_message(
        &self,
        webhook_url: &str,
        message: &SlackMessage,
    ) -> Result<(), IntegrationError>;
}

// ========================================
// Email
// ========================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), IntegrationError>;
}

// ========================================
// Bundle
// ========================================

/// Configured integrations, shared through `AppState`
#[derive(Clone, Default)]
pub struct Integrations {
    pub github: Option<Arc<dyn GitHubApi>>,
    pub chat: Option<Arc<dyn ChatNotifier>>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub default_slack_webhook: Option<String>,
    pub email_from: String,
}

impl Integrations {
    pub fn from_config(config: &ServerConfig) -> Result<Self, IntegrationError> {
        let github: Option<Arc<dyn GitHubApi>> = match &config.github.token {
            Some(token) => {
                info!("GitHub integration enabled ({})", config.github.api_base_url);
                Some(Arc::new(GitHubClient::new(&config.github.api_base_url, token)?))
            }
            None => {
                info!("GitHub integration disabled (no token configured)");
                None
            }
        };

        let mailer: Option<Arc<dyn Mailer>> =
            match (&config.email.api_base_url, &config.email.api_key) {
                (Some(url), Some(key)) => {
                    info!("Email integration enabled ({})", url);
                    Some(Arc::new(HttpMailer::new(url, key)?))
                }
                _ => {
                    info!("Email integration disabled (api_base_url/api_key not configured)");
                    None
                }
            };

        Ok(Self {
            github,
            chat: Some(Arc::new(SlackClient::new()?)),
            mailer,
            default_slack_webhook: config.slack.default_webhook_url.clone(),
            email_from: config.email.from_address.clone(),
        })
    }

    /// Project webhook, else the configured default
    pub fn webhook_for(&self, project: &Project) -> Option<String> {
        project
            .slack_webhook_url
            .clone()
            .or_else(|| self.default_slack_webhook.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_status() {
        assert!(matches!(
            translate_status(StatusCode::UNAUTHORIZED, String::new()),
            IntegrationError::Unauthorized(_)
        ));
        assert!(matches!(
            translate_status(StatusCode::FORBIDDEN, String::new()),
            IntegrationError::Unauthorized(_)
        ));
        assert!(matches!(
            translate_status(StatusCode::NOT_FOUND, String::new()),
            IntegrationError::NotFound(_)
        ));
        assert!(matches!(
            translate_status(StatusCode::UNPROCESSABLE_ENTITY, "already_exists".into()),
            IntegrationError::Validation(m) if m == "already_exists"
        ));
        assert!(matches!(
            translate_status(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            IntegrationError::Api(503, _)
        ));
    }

    #[test]
    fn test_from_config_respects_missing_credentials() {
        let config = ServerConfig::default();
        let integrations = Integrations::from_config(&config).unwrap();
        assert!(integrations.github.is_none());
        assert!(integrations.mailer.is_none());
        assert!(integrations.chat.is_some());
    }

    #[test]
    fn test_from_config_enables_configured_clients() {
        let mut config = ServerConfig::default();
        config.github.token = Some("ghp_x".into());
        config.email.api_base_url = Some("https://mail.example.com".into());
        config.email.api_key = Some("key".into());

        let integrations = Integrations::from_config(&config).unwrap();
        assert!(integrations.github.is_some());
        assert!(integrations.mailer.is_some());
    }
}
