//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use tebnegar_types::error::{RepositoryError, ServiceError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors surfaced by the core services.
    Service(ServiceError),
    /// Missing or wrong admin API key.
    Forbidden(String),
    /// Malformed request input caught in the HTTP layer.
    Validation(String),
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        AppError::Service(e)
    }
}

impl AppError {
    /// Status, machine-readable code, and message for this error.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Service(ServiceError::Validation(msg)) | AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Service(ServiceError::Repository(RepositoryError::NotFound)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found".to_string(),
            ),
            AppError::Service(ServiceError::Repository(RepositoryError::Conflict(msg))) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Service(ServiceError::Repository(e)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", e.to_string())
            }
            AppError::Service(ServiceError::Provider(e)) => {
                (StatusCode::BAD_GATEWAY, "PROVIDER_UNAVAILABLE", e.to_string())
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }

        let body = ApiResponse::error(code, &message, uuid::Uuid::now_v7().to_string());
        let body = serde_json::to_string(&body).unwrap_or_default();

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
