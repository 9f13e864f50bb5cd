//! Configuration and endpoint defaults for OpenAI-compatible providers.

use secrecy::SecretString;

/// Configuration for an OpenAI-compatible chat completions endpoint.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Provider name reported in logs and errors (e.g., "openai").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Model identifier (e.g., "gpt-4o").
    pub model: String,
}

/// OpenAI default configuration.
///
/// Base URL: `https://api.openai.com/v1`
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key,
        model: model.into(),
    }
}

/// Google Gemini through its OpenAI-compatible endpoint.
///
/// Base URL: `https://generativelanguage.googleapis.com/v1beta/openai`
pub fn gemini_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "gemini".into(),
        base_url: "https://generativelanguage.googleapis.com/v1beta/openai".into(),
        api_key,
        model: model.into(),
    }
}

/// Any other endpoint, named after the provider kind.
pub fn custom(api_key: SecretString, base_url: &str, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai_compatible".into(),
        base_url: base_url.trim_end_matches('/').into(),
        api_key,
        model: model.into(),
    }
}
