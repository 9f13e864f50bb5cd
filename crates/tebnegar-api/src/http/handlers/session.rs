//! Anonymous session handlers.
//!
//! Endpoints:
//! - POST /api/v1/sessions          - Start a session and its first conversation
//! - POST /api/v1/sessions/{id}/end - End a session

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use tebnegar_types::session::{NewSession, SessionAttribution};

use crate::http::error::AppError;
use crate::http::extractors::client::ClientInfo;
use crate::http::handlers::{elapsed_ms, parse_uuid};
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/sessions - Called once when the frontend loads.
pub async fn create_session(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(attribution): Json<SessionAttribution>,
) -> Result<(StatusCode, ApiResponse<NewSession>), AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let created = state
        .session_service
        .start_session(attribution, client.ip_address, client.user_agent)
        .await?;

    let conversation_link = format!("/api/v1/conversations/{}/messages", created.conversation_id);
    let resp = ApiResponse::success(created, request_id, elapsed_ms(start))
        .with_link("conversation", &conversation_link);

    Ok((StatusCode::CREATED, resp))
}

/// POST /api/v1/sessions/{id}/end - Beacon on page unload.
///
/// Always 204 for a well-formed id, so callers cannot probe which sessions exist.
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let sid = parse_uuid(&session_id)?;
    state.session_service.end_session(sid).await?;
    Ok(StatusCode::NO_CONTENT)
}
