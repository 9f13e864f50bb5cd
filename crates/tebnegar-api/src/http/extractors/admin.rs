//! Admin API key extractor.
//!
//! The key travels in the `X-API-KEY` header. Only its SHA-256 hash is kept
//! in [`AppState`], and the comparison is between hashes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};

use crate::http::error::AppError;
use crate::state::AppState;

pub const ADMIN_KEY_HEADER: &str = "x-api-key";

/// Marker for a request that carried the admin key.
pub struct AdminKey;

impl FromRequestParts<AppState> for AdminKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let forbidden = || AppError::Forbidden("Could not validate credentials".to_string());

        let expected = state.admin_key_hash.as_deref().ok_or_else(forbidden)?;
        let provided = parts
            .headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(forbidden)?;

        if hash_api_key(provided) == expected {
            Ok(AdminKey)
        } else {
            tracing::warn!("admin request with wrong API key");
            Err(forbidden())
        }
    }
}

/// Compute SHA-256 hash of an API key (lowercase hex).
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{:x}", digest)
}
