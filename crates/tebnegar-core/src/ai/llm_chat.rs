//! Chat sessions on top of a stateless completion provider.
//!
//! The session handle keeps the turn history on our side; each send replays
//! the system instruction and full history plus the new user turn.

use std::sync::Arc;

use tebnegar_types::ai::{AiError, ProviderReply, SessionHandle, Turn, TurnRole};
use tebnegar_types::llm::{CompletionRequest, Message, MessageRole};
use tracing::debug;

use crate::ai::provider::AiProvider;
use crate::llm::box_provider::BoxLlmProvider;

/// [`AiProvider`] that drives any configured [`BoxLlmProvider`].
#[derive(Debug)]
pub struct LlmChatProvider {
    llm: BoxLlmProvider,
    system_instruction: Arc<str>,
    max_tokens: u32,
    temperature: Option<f64>,
}

impl LlmChatProvider {
    pub fn new(llm: BoxLlmProvider, system_instruction: &str, max_tokens: u32) -> Self {
        Self {
            llm,
            system_instruction: Arc::from(system_instruction),
            max_tokens,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_request(&self, handle: &SessionHandle, text: &str) -> CompletionRequest {
        let mut messages: Vec<Message> = handle.history().iter().map(to_message).collect();
        messages.push(Message {
            role: MessageRole::User,
            content: text.to_string(),
        });

        CompletionRequest {
            model: self.llm.model().to_string(),
            messages,
            system: Some(handle.system_instruction().to_string()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

fn to_message(turn: &Turn) -> Message {
    let role = match turn.role {
        TurnRole::User => MessageRole::User,
        TurnRole::Model => MessageRole::Assistant,
    };
    Message {
        role,
        content: turn.content.clone(),
    }
}

impl AiProvider for LlmChatProvider {
    fn name(&self) -> &str {
        self.llm.name()
    }

    async fn start_session(&self, seed: Vec<Turn>) -> Result<SessionHandle, AiError> {
        Ok(SessionHandle::new(self.system_instruction.clone(), seed))
    }

    async fn send_message(
        &self,
        handle: &mut SessionHandle,
        text: &str,
    ) -> Result<ProviderReply, AiError> {
        let request = self.build_request(handle, text);

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AiError::unavailable(self.llm.name(), e.to_string()))?;

        debug!(
            session = %handle.id(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = %response.stop_reason,
            "completion received"
        );

        handle.push(Turn::user(text));
        handle.push(Turn::model(response.content.clone()));

        Ok(ProviderReply {
            text: response.content,
            turns_appended: 2,
            usage: Some(response.usage),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tebnegar_types::llm::{CompletionResponse, LlmError, StopReason, Usage};

    use super::*;
    use crate::llm::provider::LlmProvider;

    /// Records every request and answers with a fixed reply or an error.
    struct ScriptedLlm {
        reply: Result<String, ()>,
        seen: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl LlmProvider for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    id: "r".to_string(),
                    content: text.clone(),
                    model: request.model.clone(),
                    stop_reason: StopReason::EndTurn,
                    usage: Usage {
                        input_tokens: 12,
                        output_tokens: 5,
                    },
                }),
                Err(()) => Err(LlmError::Overloaded("try later".to_string())),
            }
        }
    }

    fn provider(reply: Result<&str, ()>) -> (LlmChatProvider, Arc<Mutex<Vec<CompletionRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let llm = ScriptedLlm {
            reply: reply.map(str::to_string),
            seen: seen.clone(),
        };
        (
            LlmChatProvider::new(BoxLlmProvider::new(llm), "be kind", 256),
            seen,
        )
    }

    #[tokio::test]
    async fn test_send_appends_two_turns_and_replays_history() {
        let (provider, seen) = provider(Ok("How long has it hurt?"));
        let mut handle = provider
            .start_session(vec![Turn::user("hi"), Turn::model("hello")])
            .await
            .unwrap();

        let reply = provider.send_message(&mut handle, "my head hurts").await.unwrap();

        assert_eq!(reply.text, "How long has it hurt?");
        assert_eq!(reply.turns_appended, 2);
        assert_eq!(reply.usage.unwrap().input_tokens, 12);
        assert_eq!(handle.len(), 4);
        assert_eq!(handle.history()[2], Turn::user("my head hurts"));

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 3);
        assert_eq!(requests[0].messages[1].role, MessageRole::Assistant);
        assert_eq!(requests[0].system.as_deref(), Some("be kind"));
        assert_eq!(requests[0].model, "scripted-1");
    }

    #[tokio::test]
    async fn test_failed_send_leaves_history_untouched() {
        let (provider, _) = provider(Err(()));
        let mut handle = provider.start_session(Vec::new()).await.unwrap();

        let err = provider.send_message(&mut handle, "hello").await.unwrap_err();

        assert!(matches!(err, AiError::ProviderUnavailable { ref provider, .. } if provider == "scripted"));
        assert!(handle.is_empty());
    }
}
