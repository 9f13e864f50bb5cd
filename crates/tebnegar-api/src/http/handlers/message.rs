//! POST /api/v1/messages/{conversation_id} - the chat exchange.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use tebnegar_types::conversation::PostedMessage;

use crate::http::error::AppError;
use crate::http::handlers::{elapsed_ms, parse_uuid};
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

/// Store the user's message and return the assistant's reply.
///
/// A provider failure answers 502; the user message stays stored.
pub async fn post_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> Result<ApiResponse<PostedMessage>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let cid = parse_uuid(&conversation_id)?;

    let posted = state
        .conversation_service
        .post_message(cid, &body.content)
        .await?;

    let history_link = format!("/api/v1/conversations/{cid}/messages");
    Ok(ApiResponse::success(posted, request_id, elapsed_ms(start))
        .with_link("conversation", &history_link))
}
