//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod backup;
pub mod conversation;
pub mod feedback;
pub mod pool;
pub mod session;

use chrono::{DateTime, Utc};
use tebnegar_types::error::RepositoryError;

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn parse_uuid(s: &str, what: &str) -> Result<uuid::Uuid, RepositoryError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {what}: {e}")))
}
