//! GitHub REST client
//!
//! Only the two calls Shipyard needs: create a release for a tag, and list
//! tags so the UI can offer them when drafting a release.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{
    http_client, translate_status, CreateGitHubRelease, GitHubApi, GitHubRelease,
    IntegrationError,
};

const TAGS_PER_PAGE: u32 = 100;

pub struct GitHubClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct GitHubTag {
    name: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, IntegrationError> {
        Ok(Self {
            http_client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, IntegrationError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(translate_status(status, body))
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn create_release(
        &self,
        repo: &str,
        release: &CreateGitHubRelease,
    ) -> Result<GitHubRelease, IntegrationError> {
        debug!(repo = %repo, tag = %release.tag_name, "Creating GitHub release");

        let response = self
            .request(reqwest::Method::POST, &format!("/repos/{}/releases", repo))
            .json(release)
            .send()
            .await
            .map_err(|e| IntegrationError::Network(e.to_string()))?;

        let created: GitHubRelease = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| IntegrationError::Parse(e.to_string()))?;

        info!(
            repo = %repo,
            tag = %created.tag_name,
            github_release_id = created.id,
            "Created GitHub release"
        );

        Ok(created)
    }

    async fn list_tags(&self, repo: &str) -> Result<Vec<String>, IntegrationError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/repos/{}/tags?per_page={}", repo, TAGS_PER_PAGE),
            )
            .send()
            .await
            .map_err(|e| IntegrationError::Network(e.to_string()))?;

        let tags: Vec<GitHubTag> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| IntegrationError::Parse(e.to_string()))?;

        Ok(tags.into_iter().map(|t| t.name).collect())
    }
}
