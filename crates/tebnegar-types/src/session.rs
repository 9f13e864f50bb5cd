//! Anonymous user session types.
//!
//! A user session is created once when the web app loads. It records the
//! marketing attribution of the visit and owns the visitor's conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marketing attribution supplied by the client when a session starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionAttribution {
    pub landing_page_url: Option<String>,
    pub referrer_url: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub client_metadata: Option<serde_json::Value>,
}

/// A stored anonymous user session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(flatten)]
    pub attribution: SessionAttribution,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Identifiers handed back when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    pub session_id: Uuid,
    pub conversation_id: Uuid,
}
