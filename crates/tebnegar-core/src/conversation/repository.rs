//! ConversationRepository trait definition.

use tebnegar_types::conversation::{AiAnalysis, Conversation, ConversationSummary, Message};
use tebnegar_types::error::RepositoryError;
use uuid::Uuid;

use crate::repository::Page;

/// Repository trait for conversations, messages, and AI analyses.
///
/// Implementations live in tebnegar-infra (e.g., `SqliteConversationRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ConversationRepository: Send + Sync {
    /// Create a conversation. Fails with `NotFound` if its session does not exist.
    fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    fn get_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// Conversations of a session, newest first.
    fn list_conversations(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;

    /// Messages of a conversation, oldest first.
    fn get_messages(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    fn get_message(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Message>, RepositoryError>> + Send;

    /// Persist a user message. Fails with `NotFound` for an unknown conversation.
    fn save_user_message(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Persist an AI message and its analysis in a single transaction.
    fn save_ai_message_with_analysis(
        &self,
        message: &Message,
        analysis: &AiAnalysis,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Fails with `NotFound` for an unknown conversation.
    fn update_title(
        &self,
        id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a conversation with its messages, analyses and feedback.
    fn delete_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Conversations with at least one message containing `keyword`,
    /// newest first.
    fn search_conversations(
        &self,
        keyword: &str,
        page: Page,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationSummary>, RepositoryError>> + Send;
}
