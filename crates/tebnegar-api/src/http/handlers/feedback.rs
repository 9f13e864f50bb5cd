//! User feedback handlers.
//!
//! Endpoints:
//! - POST /api/v1/response-feedback/{message_id} - Like/dislike an AI reply
//! - POST /api/v1/survey                         - Satisfaction survey

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use tebnegar_types::feedback::{FeedbackType, ResponseFeedback, SurveyResponse};

use crate::http::error::AppError;
use crate::http::handlers::{elapsed_ms, parse_uuid};
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResponseFeedbackRequest {
    pub feedback_type: FeedbackType,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SurveyRequest {
    pub session_id: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// POST /api/v1/response-feedback/{message_id}
pub async fn submit_response_feedback(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(body): Json<ResponseFeedbackRequest>,
) -> Result<(StatusCode, ApiResponse<ResponseFeedback>), AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let mid = parse_uuid(&message_id)?;

    let feedback = state
        .feedback_service
        .submit_response_feedback(mid, body.feedback_type, body.comment)
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::success(feedback, request_id, elapsed_ms(start)),
    ))
}

/// POST /api/v1/survey
pub async fn submit_survey(
    State(state): State<AppState>,
    Json(body): Json<SurveyRequest>,
) -> Result<(StatusCode, ApiResponse<SurveyResponse>), AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    // Out-of-range values fall through to the service's 1-5 check.
    let rating = u8::try_from(body.rating).unwrap_or(0);
    let survey = state
        .feedback_service
        .submit_survey(body.session_id, rating, body.comment)
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::success(survey, request_id, elapsed_ms(start)),
    ))
}
