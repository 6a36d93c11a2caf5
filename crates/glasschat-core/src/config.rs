use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};
use tracing::warn;

use crate::provider::PayloadField;

pub const DEFAULT_ENDPOINT: &str = "https://api.example.com/chat";

pub const ENDPOINT_ENV: &str = "GLASSCHAT_ENDPOINT";
pub const PAYLOAD_FIELD_ENV: &str = "GLASSCHAT_PAYLOAD_FIELD";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub payload_field: PayloadField,
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            endpoint: default_endpoint(),
            payload_field: PayloadField::Message,
            log_level: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Environment variables win over the file.
    pub fn apply_env(mut self) -> Self {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(PAYLOAD_FIELD_ENV).ok(),
        );
        self
    }

    pub fn apply_overrides(&mut self, endpoint: Option<String>, payload_field: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(raw) = payload_field {
            match PayloadField::from_str(&raw) {
                Some(field) => self.payload_field = field,
                None => warn!(payload_field = %raw, "Ignoring unknown payload field"),
            }
        }
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("glasschat"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.endpoint = "http://localhost:8080/chat".to_string();
        config.payload_field = PayloadField::Prompt;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"payload_field":"prompt"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.payload_field, PayloadField::Prompt);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_overrides_ignore_blank_and_unknown_values() {
        let mut config = Config::new();
        config.apply_overrides(Some("  ".to_string()), Some("query".to_string()));
        assert_eq!(config, Config::new());

        config.apply_overrides(Some("http://x/chat".to_string()), Some("prompt".to_string()));
        assert_eq!(config.endpoint, "http://x/chat");
        assert_eq!(config.payload_field, PayloadField::Prompt);
    }
}
