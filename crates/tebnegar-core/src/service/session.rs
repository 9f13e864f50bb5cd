//! Anonymous session lifecycle.

use chrono::Utc;
use tebnegar_types::conversation::{Conversation, DEFAULT_CONVERSATION_TITLE};
use tebnegar_types::error::ServiceError;
use tebnegar_types::session::{NewSession, SessionAttribution, UserSession};
use tracing::{debug, info};
use uuid::Uuid;

use crate::repository::session::SessionRepository;

/// Starts and ends anonymous user sessions.
pub struct SessionService<S: SessionRepository> {
    repo: S,
}

impl<S: SessionRepository> SessionService<S> {
    pub fn new(repo: S) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &S {
        &self.repo
    }

    /// Create a session and its first conversation.
    pub async fn start_session(
        &self,
        attribution: SessionAttribution,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<NewSession, ServiceError> {
        let now = Utc::now();
        let session = UserSession {
            id: Uuid::now_v7(),
            ip_address,
            user_agent,
            attribution,
            started_at: now,
            ended_at: None,
        };
        let conversation = Conversation {
            id: Uuid::now_v7(),
            session_id: session.id,
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            created_at: now,
        };

        self.repo
            .create_with_conversation(&session, &conversation)
            .await?;

        info!(
            session_id = %session.id,
            utm_source = session.attribution.utm_source.as_deref().unwrap_or("-"),
            "session started"
        );
        Ok(NewSession {
            session_id: session.id,
            conversation_id: conversation.id,
        })
    }

    /// Mark a session as ended. Unknown or already ended sessions are ignored.
    pub async fn end_session(&self, session_id: Uuid) -> Result<(), ServiceError> {
        let updated = self.repo.end(&session_id, Utc::now()).await?;
        if updated {
            info!(session_id = %session_id, "session ended");
        } else {
            debug!(session_id = %session_id, "end requested for unknown or ended session");
        }
        Ok(())
    }
}
