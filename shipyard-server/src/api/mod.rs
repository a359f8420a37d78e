//! HTTP API handlers
//!
//! Each module exposes a `*_routes()` builder; [`crate::build_router`] decides
//! which of them sit behind the auth middleware.

pub mod deployments;
pub mod environments;
pub mod health;
pub mod invitations;
pub mod members;
pub mod projects;
pub mod releases;
pub mod users;

pub use deployments::deployment_routes;
pub use environments::environment_routes;
pub use health::health_routes;
pub use invitations::invitation_routes;
pub use members::member_routes;
pub use projects::project_routes;
pub use releases::release_routes;
pub use users::user_routes;
