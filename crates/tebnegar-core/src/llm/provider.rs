//! LlmProvider trait definition.
//!
//! The stateless completion abstraction that backend clients implement.
//! Uses RPITIT for `complete`; see [`super::box_provider`] for dynamic dispatch.

use tebnegar_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for LLM provider backends (Gemini, OpenAI-compatible, ...).
///
/// Implementations live in tebnegar-infra. A provider holds no conversation
/// state: every request carries the full message list.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
