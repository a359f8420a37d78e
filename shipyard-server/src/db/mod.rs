//! Repository layer
//!
//! One module per table. Functions take either a pool (reads) or any sqlx
//! executor (writes that may run inside a transaction). Rows are mapped to
//! `shipyard_common::models` types by hand; ids are stored as UUID strings and
//! timestamps as RFC 3339 text.

pub mod deployments;
pub mod environments;
pub mod invitations;
pub mod members;
pub mod projects;
pub mod releases;
pub mod users;

use chrono::{DateTime, Utc};
use shipyard_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

pub(crate) fn uuid_col(row: &SqliteRow, col: &str) -> Result<Uuid> {
    let value: String = row.try_get(col)?;
    Uuid::parse_str(&value)
        .map_err(|e| Error::Internal(format!("Invalid UUID in column {}: {}", col, e)))
}

pub(crate) fn opt_uuid_col(row: &SqliteRow, col: &str) -> Result<Option<Uuid>> {
    let value: Option<String> = row.try_get(col)?;
    value
        .map(|v| Uuid::parse_str(&v))
        .transpose()
        .map_err(|e| Error::Internal(format!("Invalid UUID in column {}: {}", col, e)))
}

pub(crate) fn ts_col(row: &SqliteRow, col: &str) -> Result<DateTime<Utc>> {
    let value: String = row.try_get(col)?;
    time::from_db(&value)
}

pub(crate) fn opt_ts_col(row: &SqliteRow, col: &str) -> Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.try_get(col)?;
    time::from_db_opt(value)
}

/// Columns holding lowercase enum names (roles, statuses)
pub(crate) fn enum_col<T>(row: &SqliteRow, col: &str) -> Result<T>
where
    T: FromStr<Err = Error>,
{
    let value: String = row.try_get(col)?;
    value.parse()
}

