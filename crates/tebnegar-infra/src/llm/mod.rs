//! LLM provider implementations.
//!
//! Concrete [`LlmProvider`](tebnegar_core::llm::provider::LlmProvider)
//! backends plus the factory ([`create_provider`]) that picks one from the
//! `[provider]` section of `config.toml`.

pub mod gemini;
pub mod openai_compat;

use secrecy::SecretString;

use tebnegar_core::llm::box_provider::BoxLlmProvider;
use tebnegar_types::config::ProviderConfig;
use tebnegar_types::llm::{CompletionRequest, LlmError, Message, MessageRole, ProviderKind};

use self::gemini::GeminiProvider;
use self::openai_compat::OpenAiCompatibleProvider;

/// Read the API key from the environment variable named in the config.
///
/// A missing or blank variable is an authentication failure.
pub fn resolve_api_key(config: &ProviderConfig) -> Result<SecretString, LlmError> {
    match std::env::var(&config.api_key_env) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        _ => {
            tracing::error!(env = %config.api_key_env, "LLM API key is not set");
            Err(LlmError::AuthenticationFailed)
        }
    }
}

/// Create a [`BoxLlmProvider`] from a [`ProviderConfig`].
pub fn create_provider(
    config: &ProviderConfig,
    api_key: SecretString,
) -> Result<BoxLlmProvider, LlmError> {
    match config.kind {
        ProviderKind::Gemini => {
            let mut provider = GeminiProvider::new(api_key, config.model.clone())?;
            if let Some(base_url) = config.base_url.as_deref() {
                provider = provider.with_base_url(base_url.to_string());
            }
            Ok(BoxLlmProvider::new(provider))
        }
        ProviderKind::OpenAiCompatible => {
            let provider = match config.base_url.as_deref() {
                Some(base_url) => OpenAiCompatibleProvider::new(openai_compat::config::custom(
                    api_key,
                    base_url,
                    &config.model,
                )),
                None => OpenAiCompatibleProvider::openai(api_key, &config.model),
            };
            Ok(BoxLlmProvider::new(provider))
        }
    }
}

/// Classify a non-2xx HTTP status from any provider.
pub(crate) fn error_for_status(status: u16, message: String) -> LlmError {
    match status {
        400 | 404 | 422 => LlmError::InvalidRequest(message),
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: None,
        },
        500 | 502 | 503 | 504 | 529 => LlmError::Overloaded(message),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

/// Check provider connectivity with a minimal completion request.
pub async fn test_provider_connection(provider: &BoxLlmProvider) -> Result<(), LlmError> {
    let request = CompletionRequest {
        model: String::new(),
        messages: vec![Message {
            role: MessageRole::User,
            content: "Hello".to_string(),
        }],
        system: None,
        max_tokens: 10,
        temperature: Some(0.0),
    };
    provider.complete(&request).await?;
    Ok(())
}
