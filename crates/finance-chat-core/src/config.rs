use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::ai::gemini::DEFAULT_BASE_URL;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const APP_DIR: &str = "finance-chat";
const SESSION_FILE: &str = "finance-chat-context.json";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub session_path: Option<PathBuf>,
    pub base_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    /// API key from the environment first, then the config file.
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.clone())
    }

    /// Gemini endpoint, for proxies and local testing.
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn model(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// Snapshot location. Without a usable data directory the snapshot lives
    /// in the working directory.
    pub fn session_path(&self) -> PathBuf {
        match &self.session_path {
            Some(path) => path.clone(),
            None => snapshot_path_in(Self::data_dir()),
        }
    }

    /// Directory for the snapshot and log file.
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join(APP_DIR))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join(APP_DIR).join("config.json"))
    }
}

fn snapshot_path_in(data_dir: Result<PathBuf>) -> PathBuf {
    match data_dir {
        Ok(dir) => dir.join(SESSION_FILE),
        Err(e) => {
            warn!(error = %e, "falling back to a snapshot in the working directory");
            PathBuf::from(SESSION_FILE)
        }
    }
}

/// Blank values count as not configured, so an empty variable does not hide
/// the key from the config file.
fn resolve_api_key(from_env: Option<String>, from_file: Option<String>) -> Option<String> {
    let non_blank = |key: String| {
        let key = key.trim().to_string();
        (!key.is_empty()).then_some(key)
    };

    from_env.and_then(non_blank).or_else(|| from_file.and_then(non_blank))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_falls_back_to_default() {
        let config = Config::new();
        assert_eq!(config.model(), DEFAULT_MODEL);

        let config = Config {
            model: Some("   ".to_string()),
            ..Config::new()
        };
        assert_eq!(config.model(), DEFAULT_MODEL);

        let config = Config {
            model: Some("gemini-2.5-pro".to_string()),
            ..Config::new()
        };
        assert_eq!(config.model(), "gemini-2.5-pro");
    }

    #[test]
    fn explicit_session_path_wins() {
        let config = Config {
            session_path: Some(PathBuf::from("/tmp/chat.json")),
            ..Config::new()
        };
        assert_eq!(config.session_path(), PathBuf::from("/tmp/chat.json"));
    }

    #[test]
    fn missing_data_dir_uses_working_directory() {
        assert_eq!(
            snapshot_path_in(Err(anyhow!("Could not determine data directory"))),
            PathBuf::from(SESSION_FILE)
        );
        assert_eq!(
            snapshot_path_in(Ok(PathBuf::from("/data/finance-chat"))),
            PathBuf::from("/data/finance-chat").join(SESSION_FILE)
        );
    }

    #[test]
    fn environment_key_wins_over_config_file() {
        assert_eq!(
            resolve_api_key(Some("from-env".into()), Some("from-config".into())),
            Some("from-env".to_string())
        );
    }

    #[test]
    fn blank_environment_key_falls_back_to_config_file() {
        assert_eq!(
            resolve_api_key(Some(String::new()), Some("from-config".into())),
            Some("from-config".to_string())
        );
        assert_eq!(
            resolve_api_key(Some("   ".into()), Some(" from-config ".into())),
            Some("from-config".to_string())
        );
        assert_eq!(resolve_api_key(None, Some("from-config".into())), Some("from-config".to_string()));
    }

    #[test]
    fn blank_everywhere_means_no_key() {
        assert_eq!(resolve_api_key(Some(" ".into()), Some(String::new())), None);
        assert_eq!(resolve_api_key(None, None), None);
    }

    #[test]
    fn base_url_defaults_to_public_endpoint() {
        assert_eq!(Config::new().base_url(), DEFAULT_BASE_URL);

        let config = Config {
            base_url: Some("http://127.0.0.1:8080/v1beta".to_string()),
            ..Config::new()
        };
        assert_eq!(config.base_url(), "http://127.0.0.1:8080/v1beta");
    }

    #[test]
    fn parses_partial_config_file() {
        let config: Config = serde_json::from_str(r#"{"model": "gemini-2.0-flash"}"#).unwrap();
        assert_eq!(config.model(), "gemini-2.0-flash");
        assert!(config.api_key.is_none());
    }
}
