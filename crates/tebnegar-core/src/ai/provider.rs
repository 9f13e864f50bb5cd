//! AiProvider trait definition.

use tebnegar_types::ai::{AiError, ProviderReply, SessionHandle, Turn};

/// A backend able to hold multi-turn chat sessions.
///
/// `send_message` must append to the handle's history only when it
/// succeeds, and must report how many turns it appended.
pub trait AiProvider: Send + Sync {
    /// Provider identifier recorded with every AI analysis (e.g., "gemini").
    fn name(&self) -> &str;

    /// Start a session pre-seeded with the system instruction and `seed` turns.
    fn start_session(
        &self,
        seed: Vec<Turn>,
    ) -> impl std::future::Future<Output = Result<SessionHandle, AiError>> + Send;

    /// Send `text` as the next user turn and return the reply.
    fn send_message(
        &self,
        handle: &mut SessionHandle,
        text: &str,
    ) -> impl std::future::Future<Output = Result<ProviderReply, AiError>> + Send;
}
