//! Session repository trait definition.

use chrono::{DateTime, Utc};
use tebnegar_types::conversation::Conversation;
use tebnegar_types::error::RepositoryError;
use tebnegar_types::session::UserSession;
use uuid::Uuid;

/// Repository trait for anonymous user sessions.
///
/// Implementations live in tebnegar-infra (e.g., `SqliteSessionRepository`).
pub trait SessionRepository: Send + Sync {
    /// Store a session together with its first conversation, atomically.
    fn create_with_conversation(
        &self,
        session: &UserSession,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Set `ended_at` if the session exists and has not ended yet.
    ///
    /// Returns whether a row was updated.
    fn end(
        &self,
        id: &Uuid,
        ended_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
