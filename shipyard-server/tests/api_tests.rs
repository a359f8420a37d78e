//! Integration tests for the shipyard-server REST API
//!
//! Tests cover:
//! - Health and build info endpoints (no auth required)
//! - Authentication middleware and user provisioning
//! - Projects, environments, releases and deployments
//! - Integration side effects (GitHub, Slack) through recording fakes

mod helpers;

use axum::http::StatusCode;
use helpers::{error_code, TestApp, ADMIN_EMAIL, TEST_WEBHOOK};
use serde_json::json;
use std::sync::atomic::Ordering;

// =============================================================================
// Health Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "shipyard-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_build_info_endpoint() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/build_info", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
    assert!(body["build_timestamp"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let app = TestApp::new().await;

    let (status, body) = app.send("GET", "/api/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHORIZED");

    let (status, _) = app.send("GET", "/api/projects", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_rejected() {
    let app = TestApp::new().await;
    let claims = shipyard_server::auth::Claims {
        sub: "intruder".into(),
        email: Some("intruder@example.com".into()),
        exp: chrono::Utc::now().timestamp() + 600,
        aud: None,
        name: None,
        user_metadata: None,
    };
    let token = shipyard_server::auth::sign_token(&claims, b"wrong-secret").unwrap();

    let (status, _) = app.get("/api/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_first_login_provisions_user() {
    let app = TestApp::new().await;
    let token = app.token("auth|ada", "Ada@Example.com");

    let (status, body) = app.get("/api/me", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["display_name"], "ada");
    assert_eq!(body["role"], "user");
    assert!(body.get("auth_subject").is_none(), "subject must not be exposed");

    // Second request resolves the same user
    let (_, again) = app.get("/api/me", &token).await;
    assert_eq!(again["id"], body["id"]);
}

#[tokio::test]
async fn test_email_change_synced_on_login() {
    let app = TestApp::new().await;
    let (_, id) = app.login("auth|sam", "sam@old.example.com").await;

    let token = app.token("auth|sam", "sam@new.example.com");
    let (status, body) = app.get("/api/me", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["email"], "sam@new.example.com");
}

#[tokio::test]
async fn test_update_display_name() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;

    let (status, body) = app
        .patch("/api/me", &token, json!({ "display_name": "  Ada Lovelace " }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display_name"], "Ada Lovelace");

    let (status, body) = app.patch("/api/me", &token, json!({ "display_name": "   " })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), "VALIDATION_FAILED");
}

// =============================================================================
// Project Tests
// =============================================================================

#[tokio::test]
async fn test_create_project_makes_creator_owner() {
    let app = TestApp::new().await;
    let (token, user_id) = app.login("auth|ada", "ada@example.com").await;

    let (status, body) = app
        .post(
            "/api/projects",
            &token,
            json!({
                "name": "Billing",
                "slug": "billing",
                "description": "Invoices",
                "github_repo": "acme/billing"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "billing");
    assert_eq!(body["role"], "owner");
    assert_eq!(body["github_repo"], "acme/billing");

    let project_id = body["id"].as_str().unwrap();
    let (status, members) = app
        .get(&format!("/api/projects/{}/members", project_id), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members.as_array().unwrap().len(), 1);
    assert_eq!(members[0]["user_id"], user_id.as_str());
    assert_eq!(members[0]["role"], "owner");
}

#[tokio::test]
async fn test_duplicate_slug_conflicts() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    app.create_project(&token, "billing").await;

    let (status, body) = app
        .post("/api/projects", &token, json!({ "name": "Other", "slug": "billing" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");
}

#[tokio::test]
async fn test_create_project_validation() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;

    for payload in [
        json!({ "name": "X", "slug": "Not A Slug" }),
        json!({ "name": "", "slug": "ok" }),
        json!({ "name": "X", "slug": "ok", "github_repo": "no-slash" }),
        json!({ "name": "X", "slug": "ok", "slack_webhook_url": "ftp://hooks" }),
    ] {
        let (status, _) = app.post("/api/projects", &token, payload.clone()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "payload {}", payload);
    }
}

#[tokio::test]
async fn test_project_list_scoped_to_membership() {
    let app = TestApp::new().await;
    let (ada, _) = app.login("auth|ada", "ada@example.com").await;
    let (bob, _) = app.login("auth|bob", "bob@example.com").await;
    let (admin, _) = app.login("auth|admin", ADMIN_EMAIL).await;

    app.create_project(&ada, "alpha").await;
    app.create_project(&ada, "beta").await;
    app.create_project(&bob, "gamma").await;

    let (_, page) = app.get("/api/projects", &ada).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    let (_, page) = app.get("/api/projects", &bob).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["slug"], "gamma");

    // Admin sees all, with no role where not a member
    let (_, page) = app.get("/api/projects", &admin).await;
    assert_eq!(page["total"], 3);
    assert!(page["items"][0]["role"].is_null());
}

#[tokio::test]
async fn test_project_list_pagination() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    for slug in ["p1", "p2", "p3", "p4", "p5"] {
        app.create_project(&token, slug).await;
    }

    let (_, page) = app.get("/api/projects?page=2&per_page=2", &token).await;
    assert_eq!(page["page"], 2);
    assert_eq!(page["per_page"], 2);
    assert_eq!(page["total"], 5);
    assert_eq!(page["total_pages"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);

    // Out of range pages clamp to the last page
    let (_, page) = app.get("/api/projects?page=99&per_page=2", &token).await;
    assert_eq!(page["page"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_non_member_gets_not_found() {
    let app = TestApp::new().await;
    let (ada, _) = app.login("auth|ada", "ada@example.com").await;
    let (eve, _) = app.login("auth|eve", "eve@example.com").await;
    let project_id = app.create_project(&ada, "secret").await;

    let (status, _) = app.get(&format!("/api/projects/{}", project_id), &eve).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .patch(&format!("/api/projects/{}", project_id), &eve, json!({ "name": "Mine" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_project_clears_optional_fields() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let (_, created) = app
        .post(
            "/api/projects",
            &token,
            json!({ "name": "Web", "slug": "web", "description": "Site", "github_repo": "acme/web" }),
        )
        .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app
        .patch(
            &format!("/api/projects/{}", id),
            &token,
            json!({ "name": "Website", "description": "", "slack_webhook_url": TEST_WEBHOOK }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Website");
    assert!(body["description"].is_null());
    assert_eq!(body["github_repo"], "acme/web");
    assert_eq!(body["slack_webhook_url"], TEST_WEBHOOK);
}

#[tokio::test]
async fn test_delete_project_cascades() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "doomed").await;
    app.create_environment(&token, &project_id, "staging").await;
    app.published_release(&token, &project_id, "1.0.0").await;

    let (status, _) = app.delete(&format!("/api/projects/{}", project_id), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/projects/{}", project_id), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let releases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM releases")
        .fetch_one(&app.state.db)
        .await
        .unwrap();
    assert_eq!(releases, 0);
}

#[tokio::test]
async fn test_github_tags_proxy() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "tags").await;

    // No repository configured yet
    let (status, _) = app
        .get(&format!("/api/projects/{}/github/tags", project_id), &token)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    app.patch(
        &format!("/api/projects/{}", project_id),
        &token,
        json!({ "github_repo": "acme/tags" }),
    )
    .await;
    let (status, body) = app
        .get(&format!("/api/projects/{}/github/tags", project_id), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["repo"], "acme/tags");
    assert_eq!(body["tags"][0], "v1.1.0");

    app.github.fail.store(true, Ordering::SeqCst);
    let (status, body) = app
        .get(&format!("/api/projects/{}/github/tags", project_id), &token)
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_code(&body), "INTEGRATION_ERROR");
}

// =============================================================================
// Environment Tests
// =============================================================================

#[tokio::test]
async fn test_environment_crud() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "envs").await;
    let base = format!("/api/projects/{}/environments", project_id);

    let env_id = app.create_environment(&token, &project_id, "staging").await;

    let (status, _) = app.post(&base, &token, json!({ "name": "staging" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .patch(&format!("{}/{}", base, env_id), &token, json!({ "service_url": "" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["service_url"].is_null());

    let (_, list) = app.get(&base, &token).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert!(list[0]["current_release"].is_null());

    let (status, _) = app.delete(&format!("{}/{}", base, env_id), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("{}/{}", base, env_id), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_environment_delete_blocked_by_in_progress_deployment() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "busy").await;
    let env_id = app.create_environment(&token, &project_id, "prod").await;
    let release_id = app.published_release(&token, &project_id, "1.0.0").await;

    let (status, _) = app
        .post(
            &format!("/api/projects/{}/deployments", project_id),
            &token,
            json!({ "release_id": release_id, "environment_id": env_id, "status": "in_progress" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .delete(&format!("/api/projects/{}/environments/{}", project_id, env_id), &token)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// =============================================================================
// Release Tests
// =============================================================================

#[tokio::test]
async fn test_release_defaults_and_validation() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "rel").await;
    let base = format!("/api/projects/{}/releases", project_id);

    let (status, body) = app.post(&base, &token, json!({ "version": "v1.2.3" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["version"], "1.2.3");
    assert_eq!(body["git_tag"], "v1.2.3");
    assert_eq!(body["status"], "draft");
    assert!(body["published_at"].is_null());

    let (status, _) = app.post(&base, &token, json!({ "version": "1.2.3" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.post(&base, &token, json!({ "version": "1.2" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_created_timestamps_match_stored_values() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "stamps").await;

    let (status, created) = app
        .post(
            &format!("/api/projects/{}/releases", project_id),
            &token,
            json!({ "version": "0.1.0" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/projects/{}/releases/{}", project_id, created["id"].as_str().unwrap());
    let (status, fetched) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["created_at"], created["created_at"]);
    assert_eq!(fetched["updated_at"], created["updated_at"]);
}

#[tokio::test]
async fn test_draft_version_change_moves_default_tag() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "retag").await;
    let (_, created) = app
        .post(
            &format!("/api/projects/{}/releases", project_id),
            &token,
            json!({ "version": "1.0.0" }),
        )
        .await;
    let uri = format!("/api/projects/{}/releases/{}", project_id, created["id"].as_str().unwrap());

    let (status, body) = app
        .patch(&uri, &token, json!({ "version": "1.0.1", "notes": "Hotfix" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["git_tag"], "v1.0.1");
    assert_eq!(body["notes"], "Hotfix");
}

#[tokio::test]
async fn test_publish_release_flow() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let (_, created) = app
        .post(
            "/api/projects",
            &token,
            json!({
                "name": "Billing",
                "slug": "billing",
                "github_repo": "acme/billing",
                "slack_webhook_url": TEST_WEBHOOK
            }),
        )
        .await;
    let project_id = created["id"].as_str().unwrap();
    let (_, release) = app
        .post(
            &format!("/api/projects/{}/releases", project_id),
            &token,
            json!({ "version": "2.0.0", "title": "Big one", "notes": "Changes" }),
        )
        .await;
    let uri = format!("/api/projects/{}/releases/{}", project_id, release["id"].as_str().unwrap());

    let (status, body) = app.post_empty(&format!("{}/publish", uri), &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "published");
    assert!(body["published_at"].is_string());
    assert!(body["github_release_id"].is_number());
    assert!(body["github_release_url"]
        .as_str()
        .unwrap()
        .ends_with("/releases/tag/v2.0.0"));

    let created = app.github.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, "acme/billing");
    assert_eq!(created[0].1.name, "Big one");

    let messages = app.chat.messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, TEST_WEBHOOK);
    assert!(messages[0].1.text.contains("2.0.0"));

    // Publishing twice conflicts; version is now frozen
    let (status, _) = app.post_empty(&format!("{}/publish", uri), &token).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.patch(&uri, &token, json!({ "version": "2.0.1" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, body) = app.patch(&uri, &token, json!({ "notes": "Edited" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"], "Edited");
}

#[tokio::test]
async fn test_publish_survives_integration_failures() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let (_, created) = app
        .post(
            "/api/projects",
            &token,
            json!({ "name": "Api", "slug": "api", "github_repo": "acme/api", "slack_webhook_url": TEST_WEBHOOK }),
        )
        .await;
    let project_id = created["id"].as_str().unwrap();
    app.github.fail.store(true, Ordering::SeqCst);
    app.chat.fail.store(true, Ordering::SeqCst);

    let release_id = app.published_release(&token, project_id, "1.0.0").await;
    let uri = format!("/api/projects/{}/releases/{}", project_id, release_id);

    let (_, body) = app.get(&uri, &token).await;
    assert_eq!(body["status"], "published");
    assert!(body["github_release_id"].is_null());

    // Explicit sync reports the failure, then succeeds once GitHub recovers
    let (status, body) = app.post_empty(&format!("{}/github-sync", uri), &token).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_code(&body), "INTEGRATION_ERROR");

    app.github.fail.store(false, Ordering::SeqCst);
    let (status, body) = app.post_empty(&format!("{}/github-sync", uri), &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["github_release_id"].is_number());

    let (status, _) = app.post_empty(&format!("{}/github-sync", uri), &token).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_github_sync_requires_repo() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "norepo").await;
    let release_id = app.published_release(&token, &project_id, "1.0.0").await;

    let (status, _) = app
        .post_empty(
            &format!("/api/projects/{}/releases/{}/github-sync", project_id, release_id),
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.github.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_release_list_status_filter() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "filter").await;
    let base = format!("/api/projects/{}/releases", project_id);

    app.published_release(&token, &project_id, "1.0.0").await;
    app.post(&base, &token, json!({ "version": "1.1.0" })).await;
    app.post(&base, &token, json!({ "version": "1.2.0" })).await;

    let (_, page) = app.get(&base, &token).await;
    assert_eq!(page["total"], 3);

    let (_, page) = app.get(&format!("{}?status=draft", base), &token).await;
    assert_eq!(page["total"], 2);

    let (_, page) = app.get(&format!("{}?status=published&per_page=1", base), &token).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["version"], "1.0.0");
}

#[tokio::test]
async fn test_release_delete_blocked_by_deployments() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "keep").await;
    let env_id = app.create_environment(&token, &project_id, "prod").await;
    let deployed = app.published_release(&token, &project_id, "1.0.0").await;
    let unused = app.published_release(&token, &project_id, "1.0.1").await;

    app.post(
        &format!("/api/projects/{}/deployments", project_id),
        &token,
        json!({ "release_id": deployed, "environment_id": env_id }),
    )
    .await;

    let (status, _) = app
        .delete(&format!("/api/projects/{}/releases/{}", project_id, deployed), &token)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .delete(&format!("/api/projects/{}/releases/{}", project_id, unused), &token)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// =============================================================================
// Deployment Tests
// =============================================================================

#[tokio::test]
async fn test_deployment_lifecycle() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let (_, created) = app
        .post(
            "/api/projects",
            &token,
            json!({ "name": "Shop", "slug": "shop", "slack_webhook_url": TEST_WEBHOOK }),
        )
        .await;
    let project_id = created["id"].as_str().unwrap().to_string();
    let env_id = app.create_environment(&token, &project_id, "prod").await;
    let release_id = app.published_release(&token, &project_id, "3.1.0").await;
    app.chat.messages.lock().unwrap().clear();

    let (status, deployment) = app
        .post(
            &format!("/api/projects/{}/deployments", project_id),
            &token,
            json!({ "release_id": release_id, "environment_id": env_id, "notes": "Canary first" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(deployment["status"], "pending");
    assert!(deployment["started_at"].is_null());
    let uri = format!(
        "/api/projects/{}/deployments/{}",
        project_id,
        deployment["id"].as_str().unwrap()
    );

    let (status, body) = app
        .patch(&format!("{}/status", uri), &token, json!({ "status": "in_progress" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["started_at"].is_string());
    assert!(body["finished_at"].is_null());

    let (status, body) = app
        .patch(&format!("{}/status", uri), &token, json!({ "status": "succeeded" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["finished_at"].is_string());
    assert_eq!(body["notes"], "Canary first");

    let messages = app.chat.messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.text.contains("prod"));

    // The environment now reports the running release
    let (_, env) = app
        .get(&format!("/api/projects/{}/environments/{}", project_id, env_id), &token)
        .await;
    assert_eq!(env["current_release"]["version"], "3.1.0");

    // Illegal transitions conflict
    let (status, _) = app
        .patch(&format!("{}/status", uri), &token, json!({ "status": "in_progress" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .patch(&format!("{}/status", uri), &token, json!({ "status": "rolled_back" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rolled_back");

    let (status, _) = app
        .patch(&format!("{}/status", uri), &token, json!({ "status": "succeeded" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, env) = app
        .get(&format!("/api/projects/{}/environments/{}", project_id, env_id), &token)
        .await;
    assert!(env["current_release"].is_null());
}

#[tokio::test]
async fn test_deployment_requires_published_release_in_project() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "one").await;
    let other_id = app.create_project(&token, "two").await;
    let env_id = app.create_environment(&token, &project_id, "prod").await;
    let foreign_env = app.create_environment(&token, &other_id, "prod").await;
    let base = format!("/api/projects/{}/deployments", project_id);

    let (_, draft) = app
        .post(
            &format!("/api/projects/{}/releases", project_id),
            &token,
            json!({ "version": "0.1.0" }),
        )
        .await;
    let (status, body) = app
        .post(&base, &token, json!({ "release_id": draft["id"], "environment_id": env_id }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);

    let release_id = app.published_release(&token, &project_id, "0.2.0").await;
    let (status, _) = app
        .post(&base, &token, json!({ "release_id": release_id, "environment_id": foreign_env }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post(
            &base,
            &token,
            json!({ "release_id": release_id, "environment_id": env_id, "status": "rolled_back" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_deployment_list_filters() {
    let app = TestApp::new().await;
    let (token, _) = app.login("auth|ada", "ada@example.com").await;
    let project_id = app.create_project(&token, "filters").await;
    let staging = app.create_environment(&token, &project_id, "staging").await;
    let prod = app.create_environment(&token, &project_id, "prod").await;
    let r1 = app.published_release(&token, &project_id, "1.0.0").await;
    let r2 = app.published_release(&token, &project_id, "2.0.0").await;
    let base = format!("/api/projects/{}/deployments", project_id);

    for (release, env) in [(&r1, &staging), (&r1, &prod), (&r2, &staging)] {
        let (status, _) = app
            .post(
                &base,
                &token,
                json!({ "release_id": release, "environment_id": env, "status": "succeeded" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, page) = app.get(&base, &token).await;
    assert_eq!(page["total"], 3);

    let (_, page) = app.get(&format!("{}?environment_id={}", base, staging), &token).await;
    assert_eq!(page["total"], 2);

    let (_, page) = app
        .get(&format!("{}?environment_id={}&release_id={}", base, staging, r2), &token)
        .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["release_id"], r2.as_str());
}
