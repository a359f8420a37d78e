//! Shared test fixtures for shipyard-server integration tests
//!
//! Each `TestApp` owns a fresh SQLite file in a temp dir, a router built with
//! a known JWT secret, and recording fakes for GitHub, Slack and email.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use shipyard_common::config::ServerConfig;
use shipyard_server::auth::{sign_token, Claims};
use shipyard_server::integrations::{
    ChatNotifier, CreateGitHubRelease, EmailMessage, GitHubApi, GitHubRelease, IntegrationError,
    Integrations, Mailer, SlackMessage,
};
use shipyard_server::{build_router, AppState};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

pub const TEST_SECRET: &str = "test-jwt-secret";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const TEST_WEBHOOK: &str = "https://hooks.slack.test/T000/B000/XXX";

// =============================================================================
// Recording fakes
// =============================================================================

#[derive(Default)]
pub struct FakeGitHub {
    pub created: Mutex<Vec<(String, CreateGitHubRelease)>>,
    pub fail: AtomicBool,
    next_id: AtomicI64,
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn create_release(
        &self,
        repo: &str,
        release: &CreateGitHubRelease,
    ) -> Result<GitHubRelease, IntegrationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IntegrationError::Api(500, "boom".into()));
        }
        self.created
            .lock()
            .unwrap()
            .push((repo.to_string(), release.clone()));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1000;
        Ok(GitHubRelease {
            id,
            html_url: format!("https://github.com/{}/releases/tag/{}", repo, release.tag_name),
            tag_name: release.tag_name.clone(),
        })
    }

    async fn list_tags(&self, _repo: &str) -> Result<Vec<String>, IntegrationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IntegrationError::Unauthorized("bad token".into()));
        }
        Ok(vec!["v1.1.0".into(), "v1.0.0".into()])
    }
}

#[derive(Default)]
pub struct FakeChat {
    pub messages: Mutex<Vec<(String, SlackMessage)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl ChatNotifier for FakeChat {
    async fn post_message(
        &self,
        webhook_url: &str,
        message: &SlackMessage,
    ) -> Result<(), IntegrationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IntegrationError::Api(500, "slack down".into()));
        }
        self.messages
            .lock()
            .unwrap()
            .push((webhook_url.to_string(), message.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), IntegrationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IntegrationError::Network("connection refused".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// =============================================================================
// Test application
// =============================================================================

pub struct TestApp {
    _dir: TempDir,
    pub state: AppState,
    router: Router,
    pub github: Arc<FakeGitHub>,
    pub chat: Arc<FakeChat>,
    pub mailer: Arc<FakeMailer>,
}

/// Base test config: known secret, one listed admin
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.auth.jwt_secret = TEST_SECRET.to_string();
    config.auth.admin_emails = vec![ADMIN_EMAIL.to_string()];
    config.server.public_base_url = "https://ship.example.com".to_string();
    config
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        let dir = TempDir::new().expect("Should create temp dir");
        let pool = shipyard_common::db::init_database(&dir.path().join("shipyard.db"))
            .await
            .expect("Should initialize test database");

        let github = Arc::new(FakeGitHub::default());
        let chat = Arc::new(FakeChat::default());
        let mailer = Arc::new(FakeMailer::default());
        let integrations = Integrations {
            github: Some(github.clone()),
            chat: Some(chat.clone()),
            mailer: Some(mailer.clone()),
            default_slack_webhook: None,
            email_from: "Shipyard <noreply@ship.example.com>".to_string(),
        };

        let state = AppState::new(pool, config, integrations);
        let router = build_router(state.clone());

        Self {
            _dir: dir,
            state,
            router,
            github,
            chat,
            mailer,
        }
    }

    /// Mint an access token the server accepts
    pub fn token(&self, subject: &str, email: &str) -> String {
        let claims = Claims {
            sub: subject.to_string(),
            email: Some(email.to_string()),
            exp: chrono::Utc::now().timestamp() + 3600,
            aud: None,
            name: None,
            user_metadata: None,
        };
        sign_token(&claims, TEST_SECRET.as_bytes()).expect("Should sign token")
    }

    /// Log a user in (creating them) and return their token and id
    pub async fn login(&self, subject: &str, email: &str) -> (String, String) {
        let token = self.token(subject, email);
        let (status, body) = self.get("/api/me", &token).await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        let id = body["id"].as_str().expect("user id").to_string();
        (token, id)
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, extract_json(response.into_body()).await)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(token), Some(body)).await
    }

    /// POST without a body (publish, revoke, resend)
    pub async fn post_empty(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send("POST", uri, Some(token), None).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send("DELETE", uri, Some(token), None).await
    }

    /// Create a project owned by the token's user; returns its id
    pub async fn create_project(&self, token: &str, slug: &str) -> String {
        let (status, body) = self
            .post(
                "/api/projects",
                token,
                serde_json::json!({ "name": format!("Project {}", slug), "slug": slug }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Create a release and publish it; returns its id
    pub async fn published_release(&self, token: &str, project_id: &str, version: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/api/projects/{}/releases", project_id),
                token,
                serde_json::json!({ "version": version }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create release failed: {}", body);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, body) = self
            .post_empty(&format!("/api/projects/{}/releases/{}/publish", project_id, id), token)
            .await;
        assert_eq!(status, StatusCode::OK, "publish failed: {}", body);
        id
    }

    pub async fn create_environment(&self, token: &str, project_id: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/api/projects/{}/environments", project_id),
                token,
                serde_json::json!({ "name": name, "service_url": format!("https://{}.example.com", name) }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create environment failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Invite `email` with `role` and return the raw token from the accept URL
    pub async fn invite(&self, token: &str, project_id: &str, email: &str, role: &str) -> (String, Value) {
        let (status, body) = self
            .post(
                &format!("/api/projects/{}/invitations", project_id),
                token,
                serde_json::json!({ "email": email, "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "invite failed: {}", body);
        let accept_url = body["accept_url"].as_str().unwrap();
        let raw = accept_url.split("token=").nth(1).unwrap().to_string();
        (raw, body)
    }

    /// Add `email` to a project with `role` through the invitation flow
    pub async fn add_member(
        &self,
        owner_token: &str,
        project_id: &str,
        subject: &str,
        email: &str,
        role: &str,
    ) -> (String, String) {
        let (member_token, member_id) = self.login(subject, email).await;
        let (raw, _) = self.invite(owner_token, project_id, email, role).await;
        let (status, body) = self
            .post(
                "/api/invitations/accept",
                &member_token,
                serde_json::json!({ "token": raw }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "accept failed: {}", body);
        (member_token, member_id)
    }
}

/// Extract JSON body from response; empty bodies become `Null`
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Error code from an `{"error": {"code": ...}}` body
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
