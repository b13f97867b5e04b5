//! Configuration loading for Paraclete.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`AppConfig`]. Falls back to defaults when the file is missing or
//! malformed. The OpenAI API key is read separately from the environment
//! and wrapped in [`SecretString`]; startup fails without it.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use thiserror::Error;

use paraclete_types::config::AppConfig;

/// Environment variable holding the OpenAI API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{API_KEY_ENV} not set; the completion gateway cannot authenticate")]
    MissingApiKey,
}

/// Resolve the data directory from `PARACLETE_DATA_DIR`, falling back to
/// `~/.paraclete`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PARACLETE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".paraclete")
}

/// Load application configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns
///   the default.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No config.toml found at {}, using defaults",
                config_path.display()
            );
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
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

/// Read the OpenAI API key from the environment.
///
/// The key never appears in config files or logs; it lives in the
/// environment and is wrapped before any further handling.
pub fn load_api_key() -> Result<SecretString, ConfigError> {
    match std::env::var(API_KEY_ENV) {
        Ok(val) if !val.is_empty() => Ok(SecretString::from(val)),
        _ => Err(ConfigError::MissingApiKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
model = "gpt-4o"
persona = "You are a test persona."
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.persona, "You are a test persona.");
        // Unset fields keep defaults.
        assert_eq!(config.ask_max_tokens, 150);
    }

    #[tokio::test]
    async fn test_load_config_malformed_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "model = [broken")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.model, "gpt-4");
    }
}
