//! HTTP request handlers for the REST API.

pub mod admin;
pub mod conversation;
pub mod feedback;
pub mod health;
pub mod message;
pub mod session;

use uuid::Uuid;

use crate::http::error::AppError;

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid UUID: {s}")))
}

/// Milliseconds since `start`, for the envelope metadata.
pub(crate) fn elapsed_ms(start: std::time::Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
