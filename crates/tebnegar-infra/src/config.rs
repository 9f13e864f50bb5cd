//! Configuration loading for TebNegar.
//!
//! Reads `config.toml` from the data directory (`~/.tebnegar/` by default)
//! into [`AppConfig`]. A missing or malformed file falls back to defaults.

use std::path::{Path, PathBuf};

use tebnegar_types::config::AppConfig;

use crate::sqlite::pool::database_url_in;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "TEBNEGAR_DATA_DIR";

/// Environment variable that overrides the configured database URL.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Resolve the data directory.
///
/// Priority:
/// 1. `TEBNEGAR_DATA_DIR` environment variable
/// 2. `~/.tebnegar`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".tebnegar");
    }

    PathBuf::from(".tebnegar")
}

/// Load configuration from `{data_dir}/config.toml`.
pub async fn load_app_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Pick the database URL.
///
/// Priority:
/// 1. `env_override` (the `DATABASE_URL` variable, when set and non-empty)
/// 2. `database.url` from the config file
/// 3. `tebnegar.db` inside the data directory
pub fn resolve_database_url(
    config: &AppConfig,
    data_dir: &Path,
    env_override: Option<String>,
) -> String {
    env_override
        .filter(|url| !url.trim().is_empty())
        .or_else(|| config.database.url.clone())
        .unwrap_or_else(|| database_url_in(data_dir))
}
