//! Admin endpoints, all behind the `X-API-KEY` header.
//!
//! - GET /api/v1/admin/stats
//! - GET /api/v1/admin/response-feedback?feedback_type=&skip=&limit=
//! - GET /api/v1/admin/conversations?keyword=&skip=&limit=
//! - GET /api/v1/admin/download-db

use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use tebnegar_infra::sqlite::backup::snapshot_bytes;

use tebnegar_types::conversation::ConversationSummary;
use tebnegar_types::error::ServiceError;
use tebnegar_types::feedback::{DashboardStats, ResponseFeedbackView};

use crate::http::error::AppError;
use crate::http::extractors::admin::AdminKey;
use crate::http::extractors::query::{FeedbackListQuery, SearchQuery};
use crate::http::handlers::elapsed_ms;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/admin/stats - Aggregate counts for the dashboard.
pub async fn get_stats(
    State(state): State<AppState>,
    _admin: AdminKey,
) -> Result<ApiResponse<DashboardStats>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let stats = state.feedback_service.dashboard_stats().await?;
    Ok(ApiResponse::success(stats, request_id, elapsed_ms(start))
        .with_link("response_feedback", "/api/v1/admin/response-feedback"))
}

/// GET /api/v1/admin/response-feedback - Feedback newest first.
pub async fn list_response_feedback(
    State(state): State<AppState>,
    _admin: AdminKey,
    Query(query): Query<FeedbackListQuery>,
) -> Result<ApiResponse<Vec<ResponseFeedbackView>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let feedback = state
        .feedback_service
        .list_response_feedback(query.feedback_type, query.page())
        .await?;
    Ok(ApiResponse::success(feedback, request_id, elapsed_ms(start)))
}

/// GET /api/v1/admin/conversations - Search transcripts by keyword.
pub async fn search_conversations(
    State(state): State<AppState>,
    _admin: AdminKey,
    Query(query): Query<SearchQuery>,
) -> Result<ApiResponse<Vec<ConversationSummary>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let conversations = state
        .conversation_service
        .search_conversations(&query.keyword, query.page())
        .await?;
    Ok(ApiResponse::success(conversations, request_id, elapsed_ms(start)))
}

/// GET /api/v1/admin/download-db - Snapshot of the whole database as a file.
pub async fn download_db(
    State(state): State<AppState>,
    _admin: AdminKey,
) -> Result<Response, AppError> {
    let bytes = snapshot_bytes(&state.db_pool, &state.data_dir)
        .await
        .map_err(ServiceError::from)?;
    tracing::info!(bytes = bytes.len(), "database snapshot downloaded");

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"tebnegar.db\"",
            ),
        ],
        bytes,
    )
        .into_response())
}
