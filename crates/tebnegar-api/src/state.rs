//! Application state wiring all services together.
//!
//! Services are generic over repository and provider traits; AppState pins
//! them to the SQLite repositories and the LLM-backed chat provider.

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use tebnegar_core::ai::llm_chat::LlmChatProvider;
use tebnegar_core::ai::persona::SYSTEM_INSTRUCTION;
use tebnegar_core::ai::registry::SessionRegistry;
use tebnegar_core::conversation::service::ConversationService;
use tebnegar_core::llm::box_provider::BoxLlmProvider;
use tebnegar_core::service::feedback::FeedbackService;
use tebnegar_core::service::session::SessionService;
use tebnegar_infra::config::{load_app_config, resolve_data_dir, resolve_database_url, DATABASE_URL_ENV};
use tebnegar_infra::llm::{create_provider, resolve_api_key};
use tebnegar_infra::sqlite::conversation::SqliteConversationRepository;
use tebnegar_infra::sqlite::feedback::SqliteFeedbackRepository;
use tebnegar_infra::sqlite::pool::DatabasePool;
use tebnegar_infra::sqlite::session::SqliteSessionRepository;
use tebnegar_types::config::AppConfig;

use crate::http::extractors::admin::hash_api_key;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteRegistry = SessionRegistry<LlmChatProvider>;

pub type ConcreteConversationService =
    ConversationService<SqliteConversationRepository, LlmChatProvider>;

pub type ConcreteSessionService = SessionService<SqliteSessionRepository>;

pub type ConcreteFeedbackService =
    FeedbackService<SqliteFeedbackRepository, SqliteConversationRepository>;

/// Data directory, parsed config, and an open database.
///
/// Enough for commands that never talk to the LLM (`stats`).
pub struct Storage {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub db_pool: DatabasePool,
}

impl Storage {
    /// Resolve the data directory, read `config.toml`, and open the database.
    pub async fn open() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_app_config(&data_dir).await;
        let db_url = resolve_database_url(&config, &data_dir, std::env::var(DATABASE_URL_ENV).ok());
        let db_pool = DatabasePool::new(&db_url).await?;
        tracing::debug!(data_dir = %data_dir.display(), "storage opened");

        Ok(Self {
            data_dir,
            config,
            db_pool,
        })
    }
}

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub conversation_service: Arc<ConcreteConversationService>,
    pub session_service: Arc<ConcreteSessionService>,
    pub feedback_service: Arc<ConcreteFeedbackService>,
    pub registry: Arc<ConcreteRegistry>,
    pub config: Arc<AppConfig>,
    /// SHA-256 of the admin API key; `None` disables the admin endpoints.
    pub admin_key_hash: Option<Arc<str>>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Build the LLM provider from config and environment, then wire services.
    pub async fn init(storage: Storage) -> anyhow::Result<Self> {
        let api_key = resolve_api_key(&storage.config.provider).map_err(|e| {
            anyhow::anyhow!(
                "{e}: set {} to the provider API key",
                storage.config.provider.api_key_env
            )
        })?;
        let llm = create_provider(&storage.config.provider, api_key)?;

        let admin_key = std::env::var(&storage.config.admin.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);
        if admin_key.is_none() {
            tracing::warn!(
                env = %storage.config.admin.api_key_env,
                "admin API key not set; admin endpoints will reject every request"
            );
        }

        Ok(Self::new(storage, llm, admin_key))
    }

    /// Wire services around an already constructed LLM provider.
    pub fn new(storage: Storage, llm: BoxLlmProvider, admin_key: Option<SecretString>) -> Self {
        let Storage {
            data_dir,
            config,
            db_pool,
        } = storage;

        let chat_provider = LlmChatProvider::new(llm, SYSTEM_INSTRUCTION, config.provider.max_tokens)
            .with_temperature(config.provider.temperature);
        let registry = Arc::new(SessionRegistry::new(chat_provider, &config.registry));

        let conversation_service = ConversationService::new(
            SqliteConversationRepository::new(db_pool.clone()),
            registry.clone(),
        );
        let session_service = SessionService::new(SqliteSessionRepository::new(db_pool.clone()));
        let feedback_service = FeedbackService::new(
            SqliteFeedbackRepository::new(db_pool.clone()),
            SqliteConversationRepository::new(db_pool.clone()),
        );

        let admin_key_hash = admin_key.map(|key| Arc::from(hash_api_key(key.expose_secret())));

        Self {
            conversation_service: Arc::new(conversation_service),
            session_service: Arc::new(session_service),
            feedback_service: Arc::new(feedback_service),
            registry,
            config: Arc::new(config),
            admin_key_hash,
            data_dir,
            db_pool,
        }
    }
}
