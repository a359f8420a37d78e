//! # Shipyard Common Library
//!
//! Shared code for the Shipyard release-management service:
//! - Database schema and migrations
//! - Role hierarchy (global and project-scoped)
//! - Domain records and status lifecycles
//! - Input validation
//! - Invitation token helpers
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod roles;
pub mod time;
pub mod tokens;
pub mod validation;

pub use error::{Error, Result};
pub use roles::{ProjectRole, UserRole};
