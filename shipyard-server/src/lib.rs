//! shipyard-server library - release-management REST service
//!
//! Layers: `api` (axum handlers) → `services` (authorization and domain rules)
//! → `db` (sqlx repositories). Third-party side effects go through
//! `integrations`.

use axum::Router;
use shipyard_common::config::ServerConfig;
use sqlx::SqlitePool;
use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod authz;
pub mod db;
pub mod error;
pub mod integrations;
pub mod pagination;
pub mod services;

use integrations::Integrations;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolved configuration
    pub config: Arc<ServerConfig>,
    /// GitHub, Slack and email clients
    pub integrations: Integrations,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, config: ServerConfig, integrations: Integrations) -> Self {
        Self {
            db,
            config: Arc::new(config),
            integrations,
        }
    }
}

/// Build application router
///
/// Everything under `/api` requires a bearer token; `/health` and
/// `/build_info` are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    // Protected routes (require authentication)
    let protected = Router::new()
        .merge(api::user_routes())
        .merge(api::project_routes())
        .merge(api::environment_routes())
        .merge(api::release_routes())
        .merge(api::deployment_routes())
        .merge(api::member_routes())
        .merge(api::invitation_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new().merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
