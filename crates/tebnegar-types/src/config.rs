//! Application configuration types for TebNegar.
//!
//! `AppConfig` represents the `config.toml` in the data directory. Every
//! section and field has a default, so an empty or missing file yields a
//! working configuration. Secrets never live here; the config only names the
//! environment variables they are read from.

use serde::{Deserialize, Serialize};

use crate::llm::ProviderKind;

/// Top-level configuration for the TebNegar backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed by CORS. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Database settings. `url` falls back to `tebnegar.db` in the data dir.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
}

/// Which LLM backend answers chat messages, and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_kind")]
    pub kind: ProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    /// Endpoint override; each provider kind has its own default.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f64>,
}

fn default_provider_kind() -> ProviderKind {
    ProviderKind::Gemini
}

fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

/// Session registry bounds and timeouts.
///
/// `capacity` and `idle_ttl_secs` are both off by default, which keeps every
/// session until shutdown or conversation deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum number of live sessions; least recently used is evicted.
    #[serde(default)]
    pub capacity: Option<usize>,
    /// Sessions unused for this long are dropped by the sweeper.
    #[serde(default)]
    pub idle_ttl_secs: Option<u64>,
    /// Upper bound on any single provider call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// How often the idle sweeper runs when a TTL is set.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            idle_ttl_secs: None,
            call_timeout_secs: default_call_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Admin route protection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Environment variable holding the admin API key.
    #[serde(default = "default_admin_key_env")]
    pub api_key_env: String,
}

fn default_admin_key_env() -> String {
    "TEBNEGAR_ADMIN_API_KEY".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_admin_key_env(),
        }
    }
}
