//! OpenAI-compatible LLM provider implementation.
//!
//! One [`OpenAiCompatibleProvider`] serves OpenAI, Gemini's OpenAI endpoint,
//! and self-hosted servers (Ollama, vLLM, ...) through configurable base URLs.
//! Uses [`async_openai`] for request/response handling.

pub mod config;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, FinishReason,
};
use async_openai::error::OpenAIError;
use async_openai::Client;
use secrecy::{ExposeSecret, SecretString};

use tebnegar_core::llm::provider::LlmProvider;
use tebnegar_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, StopReason, Usage,
};

use self::config::OpenAiCompatConfig;
use super::error_for_status;

/// Provider for any OpenAI chat completions endpoint.
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.expose_secret())
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            provider_name: config.provider_name,
            model: config.model,
        }
    }

    /// OpenAI at `https://api.openai.com/v1`.
    pub fn openai(api_key: SecretString, model: &str) -> Self {
        Self::new(config::openai_defaults(api_key, model))
    }

    /// Gemini through `https://generativelanguage.googleapis.com/v1beta/openai`.
    pub fn gemini(api_key: SecretString, model: &str) -> Self {
        Self::new(config::gemini_defaults(api_key, model))
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    fn build_request(&self, request: &CompletionRequest) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref system) = request.system {
            messages.push(system_message(system.clone()));
        }

        for msg in &request.messages {
            let oai_msg = match msg.role {
                MessageRole::System => system_message(msg.content.clone()),
                MessageRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                        name: None,
                    })
                }
                MessageRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls: None,
                        function_call: None,
                    })
                }
            };
            messages.push(oai_msg);
        }

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        }
    }
}

fn system_message(content: String) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(content),
        name: None,
    })
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request);

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        let first = response.choices.first();
        let content = first
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let stop_reason = first
            .and_then(|c| c.finish_reason.as_ref())
            .map(|fr| match fr {
                FinishReason::Length => StopReason::MaxTokens,
                FinishReason::ContentFilter => StopReason::ContentFilter,
                _ => StopReason::EndTurn,
            })
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason,
            usage,
        })
    }
}

/// Map an [`OpenAIError`] to an [`LlmError`].
///
/// API errors are classified by `code`, falling back to `type`; transport
/// errors by HTTP status.
fn map_openai_error(err: OpenAIError) -> LlmError {
    match err {
        OpenAIError::ApiError(api_err) => {
            let kind = api_err
                .code
                .as_deref()
                .or(api_err.r#type.as_deref())
                .unwrap_or_default();
            match kind {
                "invalid_api_key" | "authentication_error" => LlmError::AuthenticationFailed,
                "rate_limit_exceeded" | "rate_limit_error" | "insufficient_quota" => {
                    LlmError::RateLimited {
                        retry_after_ms: None,
                    }
                }
                "server_error" | "overloaded_error" => LlmError::Overloaded(api_err.message),
                "invalid_request_error" | "context_length_exceeded" => {
                    LlmError::InvalidRequest(api_err.message)
                }
                _ => LlmError::Provider {
                    message: api_err.message,
                },
            }
        }
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) => error_for_status(status.as_u16(), e.to_string()),
            None => LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg),
        other => LlmError::Provider {
            message: other.to_string(),
        },
    }
}
