//! Feedback, survey, and dashboard statistics types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Maximum length of a free-text feedback comment, in characters.
pub const MAX_COMMENT_CHARS: usize = 2000;

/// Like/dislike reaction to an assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Like,
    Dislike,
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackType::Like => write!(f, "like"),
            FeedbackType::Dislike => write!(f, "dislike"),
        }
    }
}

impl FromStr for FeedbackType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(FeedbackType::Like),
            "dislike" => Ok(FeedbackType::Dislike),
            other => Err(format!("invalid feedback type: '{other}'")),
        }
    }
}

/// Feedback left on a single assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFeedback {
    pub id: Uuid,
    pub message_id: Uuid,
    pub feedback_type: FeedbackType,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Admin view of a feedback record, joined with the message it rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFeedbackView {
    pub id: Uuid,
    pub message_id: Uuid,
    pub message_content: String,
    pub feedback_type: FeedbackType,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A satisfaction survey answer (rating 1-5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: Uuid,
    /// Free-form session reference supplied by the client.
    pub session_id: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_sessions: u64,
    pub total_conversations: u64,
    pub total_messages: u64,
    pub like_count: u64,
    pub dislike_count: u64,
}
