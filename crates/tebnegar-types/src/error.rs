use thiserror::Error;

use crate::ai::AiError;

/// Errors from repository operations (used by trait definitions in tebnegar-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by the core services to the HTTP/CLI layer.
///
/// Persistence failures and AI provider failures stay distinct so the
/// caller can tell "your message was stored but the assistant is down"
/// apart from a storage problem.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] AiError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// Whether this error means the addressed entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::Repository(RepositoryError::NotFound))
    }
}
