//! Conversation HTTP handlers.
//!
//! Endpoints:
//! - GET    /api/v1/conversations?session_id=     - List a session's conversations
//! - POST   /api/v1/conversations                 - Create a conversation
//! - GET    /api/v1/conversations/{id}/messages   - Conversation with messages
//! - PATCH  /api/v1/conversations/{id}            - Rename
//! - DELETE /api/v1/conversations/{id}            - Delete (drops the AI session too)
//! - POST   /api/v1/conversations/{id}/generate-title - AI-generated title

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tebnegar_types::conversation::{Conversation, ConversationWithMessages};

use crate::http::error::AppError;
use crate::http::extractors::query::ConversationListQuery;
use crate::http::handlers::{elapsed_ms, parse_uuid};
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RenameConversationRequest {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationTitle {
    pub title: String,
}

/// GET /api/v1/conversations?session_id=
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationListQuery>,
) -> Result<ApiResponse<Vec<Conversation>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let session_id = query.session_id.as_deref().ok_or_else(|| {
        AppError::Validation("The 'session_id' query parameter is required".to_string())
    })?;
    let sid = parse_uuid(session_id)?;

    let conversations = state.conversation_service.list_conversations(sid).await?;
    Ok(ApiResponse::success(conversations, request_id, elapsed_ms(start)))
}

/// POST /api/v1/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    Json(body): Json<CreateConversationRequest>,
) -> Result<(StatusCode, ApiResponse<Conversation>), AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let conversation = state
        .conversation_service
        .create_conversation(body.session_id)
        .await?;

    let self_link = format!("/api/v1/conversations/{}/messages", conversation.id);
    let resp = ApiResponse::success(conversation, request_id, elapsed_ms(start))
        .with_link("self", &self_link);
    Ok((StatusCode::CREATED, resp))
}

/// GET /api/v1/conversations/{id}/messages
pub async fn get_conversation_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<ApiResponse<ConversationWithMessages>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let cid = parse_uuid(&conversation_id)?;

    let conversation = state.conversation_service.get_conversation(cid).await?;
    Ok(ApiResponse::success(conversation, request_id, elapsed_ms(start)))
}

/// PATCH /api/v1/conversations/{id}
pub async fn rename_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(body): Json<RenameConversationRequest>,
) -> Result<ApiResponse<Conversation>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let cid = parse_uuid(&conversation_id)?;

    let conversation = state
        .conversation_service
        .rename_conversation(cid, &body.title)
        .await?;
    Ok(ApiResponse::success(conversation, request_id, elapsed_ms(start)))
}

/// DELETE /api/v1/conversations/{id}
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let cid = parse_uuid(&conversation_id)?;
    state.conversation_service.delete_conversation(cid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/conversations/{id}/generate-title
///
/// Asks the conversation's AI session for a title without adding to its
/// history, and stores the result. Provider trouble yields the fallback title.
pub async fn generate_title(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<ApiResponse<ConversationTitle>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let cid = parse_uuid(&conversation_id)?;

    let title = state
        .conversation_service
        .generate_and_store_title(cid)
        .await?;
    Ok(ApiResponse::success(
        ConversationTitle { title },
        request_id,
        elapsed_ms(start),
    ))
}
