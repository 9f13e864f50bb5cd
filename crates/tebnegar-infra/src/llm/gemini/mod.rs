//! GeminiProvider -- concrete [`LlmProvider`] for Google Gemini.
//!
//! Talks to the native `generateContent` REST endpoint. Conversation turns
//! are sent as `user`/`model` contents and the system prompt travels in
//! `systemInstruction`.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and only exposed when
//! building the request header.

pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use tebnegar_core::llm::provider::LlmProvider;
use tebnegar_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, StopReason, Usage,
};

use super::error_for_status;
use self::types::{
    GeminiContent, GeminiErrorBody, GeminiPart, GeminiRequest, GeminiResponse, GenerationConfig,
};

/// Default endpoint for the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini LLM provider.
///
/// Does NOT derive Debug so the API key cannot leak through formatting.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Create a provider for `model` against the public Gemini endpoint.
    pub fn new(api_key: SecretString, model: String) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        })
    }

    /// Override the base URL (proxies, regional endpoints).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Convert a generic [`CompletionRequest`] into a [`GeminiRequest`].
    ///
    /// System-role messages are folded into `systemInstruction` after the
    /// request's own system prompt.
    fn to_gemini_request(&self, request: &CompletionRequest) -> GeminiRequest {
        let mut system_parts: Vec<GeminiPart> = request
            .system
            .iter()
            .map(|s| GeminiPart {
                text: Some(s.clone()),
            })
            .collect();
        let mut contents = Vec::with_capacity(request.messages.len());

        for msg in &request.messages {
            let role = match msg.role {
                MessageRole::System => {
                    system_parts.push(GeminiPart {
                        text: Some(msg.content.clone()),
                    });
                    continue;
                }
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            };
            contents.push(GeminiContent {
                role: Some(role.to_string()),
                parts: vec![GeminiPart {
                    text: Some(msg.content.clone()),
                }],
            });
        }

        GeminiRequest {
            system_instruction: (!system_parts.is_empty()).then(|| GeminiContent {
                role: None,
                parts: system_parts,
            }),
            contents,
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        }
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let model = if request.model.is_empty() {
            self.model.as_str()
        } else {
            request.model.as_str()
        };
        let body = self.to_gemini_request(request);

        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status.as_u16(), &error_body));
        }

        let gemini_resp: GeminiResponse = response.json().await.map_err(|e| {
            LlmError::Deserialization(format!("failed to parse response: {e}"))
        })?;

        into_completion(gemini_resp, model)
    }
}

/// Map a non-2xx status and its body to an [`LlmError`].
fn map_status_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<GeminiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());

    error_for_status(status, message)
}

/// Turn a parsed response into a [`CompletionResponse`].
///
/// A response without candidates means the prompt itself was blocked.
fn into_completion(resp: GeminiResponse, model: &str) -> Result<CompletionResponse, LlmError> {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        let reason = resp
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(LlmError::InvalidRequest(format!("prompt blocked: {reason}")));
    };

    let content: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let stop_reason = match candidate.finish_reason.as_deref() {
        Some("MAX_TOKENS") => StopReason::MaxTokens,
        Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII") => {
            StopReason::ContentFilter
        }
        _ => StopReason::EndTurn,
    };

    let usage = resp
        .usage_metadata
        .map(|u| Usage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        id: resp.response_id.unwrap_or_default(),
        content,
        model: resp.model_version.unwrap_or_else(|| model.to_string()),
        stop_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tebnegar_types::llm::Message;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(
            SecretString::from("test-key".to_string()),
            "gemini-2.5-pro".to_string(),
        )
        .unwrap()
    }

    fn msg(role: MessageRole, content: &str) -> Message {
        Message {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_request_roles_and_system_instruction() {
        let request = CompletionRequest {
            model: String::new(),
            messages: vec![
                msg(MessageRole::User, "I have a headache"),
                msg(MessageRole::Assistant, "How long has it lasted?"),
                msg(MessageRole::User, "Two days"),
            ],
            system: Some("You are TebNegar AI.".to_string()),
            max_tokens: 2048,
            temperature: Some(0.4),
        };

        let body = provider().to_gemini_request(&request);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are TebNegar AI."
        );
        let roles: Vec<&str> = json["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, ["user", "model", "user"]);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(json["generationConfig"]["temperature"], 0.4);
    }

    #[test]
    fn test_request_without_system_omits_instruction() {
        let request = CompletionRequest {
            model: String::new(),
            messages: vec![msg(MessageRole::User, "hi")],
            system: None,
            max_tokens: 64,
            temperature: None,
        };

        let json = serde_json::to_value(provider().to_gemini_request(&request)).unwrap();
        assert!(json.get("systemInstruction").is_none());
        assert!(json["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn test_url_uses_model() {
        let p = provider().with_base_url("http://localhost:9999/v1beta/".to_string());
        assert_eq!(
            p.url("gemini-2.5-flash"),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_into_completion_joins_parts_and_usage() {
        let resp: GeminiResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Rest "}, {"text": "and hydrate."}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 42, "candidatesTokenCount": 7, "totalTokenCount": 49},
                "modelVersion": "gemini-2.5-pro-001",
                "responseId": "resp-1"
            }"#,
        )
        .unwrap();

        let completion = into_completion(resp, "gemini-2.5-pro").unwrap();
        assert_eq!(completion.content, "Rest and hydrate.");
        assert_eq!(completion.id, "resp-1");
        assert_eq!(completion.model, "gemini-2.5-pro-001");
        assert_eq!(completion.stop_reason, StopReason::EndTurn);
        assert_eq!(
            completion.usage,
            Usage {
                input_tokens: 42,
                output_tokens: 7
            }
        );
    }

    #[test]
    fn test_into_completion_safety_and_max_tokens() {
        let safety: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [{"finishReason": "SAFETY"}]}"#,
        )
        .unwrap();
        let completion = into_completion(safety, "m").unwrap();
        assert_eq!(completion.stop_reason, StopReason::ContentFilter);
        assert!(completion.content.is_empty());
        assert_eq!(completion.model, "m");

        let truncated: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "partial"}]}, "finishReason": "MAX_TOKENS"}]}"#,
        )
        .unwrap();
        assert_eq!(
            into_completion(truncated, "m").unwrap().stop_reason,
            StopReason::MaxTokens
        );
    }

    #[test]
    fn test_into_completion_blocked_prompt() {
        let resp: GeminiResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let err = into_completion(resp, "m").unwrap_err();
        match err {
            LlmError::InvalidRequest(message) => assert!(message.contains("SAFETY")),
            other => panic!("Expected InvalidRequest, got: {other}"),
        }
    }

    #[test]
    fn test_map_status_error() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        match map_status_error(400, body) {
            LlmError::InvalidRequest(message) => assert_eq!(message, "API key not valid"),
            other => panic!("Expected InvalidRequest, got: {other}"),
        }
        assert!(matches!(
            map_status_error(403, ""),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            map_status_error(429, ""),
            LlmError::RateLimited { .. }
        ));
        assert!(matches!(
            map_status_error(503, "overloaded"),
            LlmError::Overloaded(_)
        ));
        assert!(matches!(
            map_status_error(418, "teapot"),
            LlmError::Provider { .. }
        ));
    }
}
