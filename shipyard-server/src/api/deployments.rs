//! Deployment endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use shipyard_common::models::Deployment;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db::deployments::DeploymentFilter;
use crate::error::ApiResult;
use crate::pagination::{Page, PageParams};
use crate::services::deployments::{self, CreateDeploymentRequest, UpdateDeploymentStatusRequest};
use crate::AppState;

/// Query parameters for listing deployments
#[derive(Debug, Default, Deserialize)]
pub struct DeploymentListQuery {
    pub environment_id: Option<Uuid>,
    pub release_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// GET /api/projects/:id/deployments
pub async fn list_deployments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
    Query(query): Query<DeploymentListQuery>,
) -> ApiResult<Json<Page<Deployment>>> {
    let filter = DeploymentFilter {
        environment_id: query.environment_id,
        release_id: query.release_id,
    };
    let params = PageParams {
        page: query.page,
        per_page: query.per_page,
    };
    Ok(Json(
        deployments::list_deployments(&state, &user, project_id, filter, params).await?,
    ))
}

/// POST /api/projects/:id/deployments
pub async fn create_deployment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(request): Json<CreateDeploymentRequest>,
) -> ApiResult<(StatusCode, Json<Deployment>)> {
    let deployment = deployments::create_deployment(&state, &user, project_id, request).await?;
    Ok((StatusCode::CREATED, Json(deployment)))
}

/// GET /api/projects/:id/deployments/:deployment_id
pub async fn get_deployment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, deployment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Deployment>> {
    Ok(Json(
        deployments::get_deployment(&state, &user, project_id, deployment_id).await?,
    ))
}

/// PATCH /api/projects/:id/deployments/:deployment_id/status
pub async fn update_deployment_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, deployment_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateDeploymentStatusRequest>,
) -> ApiResult<Json<Deployment>> {
    Ok(Json(
        deployments::update_deployment_status(&state, &user, project_id, deployment_id, request)
            .await?,
    ))
}

pub fn deployment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/projects/:id/deployments",
            get(list_deployments).post(create_deployment),
        )
        .route(
            "/api/projects/:id/deployments/:deployment_id",
            get(get_deployment),
        )
        .route(
            "/api/projects/:id/deployments/:deployment_id/status",
            patch(update_deployment_status),
        )
}
