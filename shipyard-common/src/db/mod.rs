//! Database schema, connection setup and migrations

pub mod init;
pub mod migrations;

pub use init::{init_database, init_database_url, init_database_with, DEFAULT_MAX_CONNECTIONS};
pub use migrations::{current_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
