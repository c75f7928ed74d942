//! Client configuration.
//!
//! Loaded from an optional JSON file, then overridden by environment
//! variables:
//! - `TODO_CLIENT_BASE_URL`
//! - `TODO_CLIENT_TIMEOUT_MS`
//!
//! Missing values fall back to defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const BASE_URL_ENV: &str = "TODO_CLIENT_BASE_URL";
pub const TIMEOUT_ENV: &str = "TODO_CLIENT_TIMEOUT_MS";

/// Where the API lives and how long a single request may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin plus the `/api` prefix, e.g. `https://todo.example.com/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: String, message: String },
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base URL without trailing slashes.
    pub fn endpoint(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Load from `path`. A missing or blank file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = var(BASE_URL_ENV) {
            self.base_url = base_url;
        }
        // Unparseable values are ignored.
        if let Some(ms) = var(TIMEOUT_ENV).and_then(|v| v.parse::<u64>().ok()) {
            self.timeout_ms = ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_timeout() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.endpoint(), "http://localhost:5000/api");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("http://localhost:3000/api/");
        assert_eq!(config.endpoint(), "http://localhost:3000/api");
    }

    #[test]
    fn oversized_timeout_saturates() {
        let config = ClientConfig::default().with_timeout(Duration::MAX);
        assert_eq!(config.timeout_ms, u64::MAX);
        let config = ClientConfig::default().with_timeout(Duration::from_millis(250));
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, r#"{"base_url":"https://todo.example.com/api"}"#).unwrap();
        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "https://todo.example.com/api");
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, "{").unwrap();
        let err = ClientConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_overrides_apply_and_bad_numbers_are_ignored() {
        let mut config = ClientConfig::default();
        config.apply_env_overrides(|name| match name {
            BASE_URL_ENV => Some("http://10.0.2.2:7072/api".to_string()),
            TIMEOUT_ENV => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "http://10.0.2.2:7072/api");
        assert_eq!(config.timeout_ms, 30_000);

        config.apply_env_overrides(|name| (name == TIMEOUT_ENV).then(|| "5".to_string()));
        assert_eq!(config.timeout_ms, 5);
    }
}
