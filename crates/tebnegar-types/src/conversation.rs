//! Conversation, message, and AI analysis types for TebNegar.
//!
//! A conversation belongs to one anonymous user session and holds an
//! ordered list of messages exchanged between the user and the assistant.
//! Every assistant message carries an [`AiAnalysis`] record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Title given to a freshly created conversation.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";

/// Maximum length of a user message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 5000;

/// Maximum length of a user-supplied conversation title, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Minimum keyword length for admin transcript search.
pub const MIN_SEARCH_KEYWORD_CHARS: usize = 3;

/// Who sent a message.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (sender_type IN ('USER', 'AI'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SenderType {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "AI")]
    Ai,
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderType::User => write!(f, "USER"),
            SenderType::Ai => write!(f, "AI"),
        }
    }
}

impl FromStr for SenderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USER" => Ok(SenderType::User),
            "AI" => Ok(SenderType::Ai),
            other => Err(format!("invalid sender type: '{other}'")),
        }
    }
}

/// A conversation between a user and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub session_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A single message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_type: SenderType,
    pub content: String,
    /// For assistant messages, the user message this one answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A conversation together with its messages in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Metadata recorded alongside every assistant message.
///
/// `potential_conditions` and `criticality_flag` are placeholders until a
/// medical NLU step exists; they are stored so the schema does not change
/// when one is added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub id: Uuid,
    pub message_id: Uuid,
    pub potential_conditions: Vec<String>,
    pub criticality_flag: bool,
    pub processing_time_ms: u64,
    pub ai_provider: String,
    /// Provider-reported token usage, `{}` when unavailable.
    pub token_usage: serde_json::Value,
}

/// An assistant message returned from a message exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostedMessage {
    #[serde(flatten)]
    pub message: Message,
    /// Wall-clock time the provider took to answer.
    pub elapsed_time_ms: u64,
}

/// Row of the admin transcript search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub session_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub message_count: u32,
}
