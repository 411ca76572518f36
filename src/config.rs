/// Configuration module for repochat.
///
/// Handles loading, validating, and providing default configuration values.
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Current version from Cargo.toml.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file used when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "repochat.json";

// ── Default value functions ──────────────────────────────────────────

fn default_endpoint() -> String {
    "http://localhost:8000/query".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_user_agent() -> String {
    format!("repochat/{CURRENT_VERSION}")
}

fn default_truncate_width() -> usize {
    60
}

fn default_true() -> bool {
    true
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Full URL of the analysis endpoint (`POST`).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Hard timeout per request. `0` leaves the request unbounded.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Repository preloaded into the controller on startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_repo_url: Option<String>,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    /// Visual width at which context headers are cut off.
    #[serde(default = "default_truncate_width")]
    pub truncate_width: usize,

    #[serde(default = "default_true")]
    pub color: bool,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            default_repo_url: None,
            display: DisplayConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            truncate_width: default_truncate_width(),
            color: default_true(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to [`DEFAULT_CONFIG_PATH`].
    /// If the file does not exist, returns a default config and generates a
    /// template file when the default path was used.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.endpoint_url()?;
        anyhow::ensure!(
            self.display.truncate_width > 0,
            "display.truncate_width must be positive"
        );
        anyhow::ensure!(!self.user_agent.trim().is_empty(), "user_agent must not be empty");
        Ok(())
    }

    /// Parsed analysis endpoint. Only `http` and `https` are accepted.
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint)
            .with_context(|| format!("invalid endpoint URL: {}", self.endpoint))?;
        anyhow::ensure!(
            matches!(url.scheme(), "http" | "https"),
            "endpoint must use http or https: {}",
            self.endpoint
        );
        Ok(url)
    }

    /// Health probe URL, a sibling of the query endpoint
    /// (`http://host/query` → `http://host/health`).
    pub fn health_url(&self) -> Result<Url> {
        let mut url = self.endpoint_url()?;
        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);
        url.join("health").context("failed to derive health URL")
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.endpoint, "http://localhost:8000/query");
        assert_eq!(config.request_timeout_secs, 120);
        assert!(config.user_agent.starts_with("repochat/"));
        assert!(config.default_repo_url.is_none());
        assert_eq!(config.display.truncate_width, 60);
        assert!(config.display.color);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"endpoint": "https://chat.example.com/api/query", "display": {"color": false}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.endpoint, "https://chat.example.com/api/query");
        assert!(!config.display.color);
        // Other fields should have defaults
        assert_eq!(config.display.truncate_width, 60);
        assert_eq!(config.request_timeout_secs, 120);
    }

    #[test]
    fn test_validate_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_endpoint() {
        let mut config = Config::default();
        config.endpoint = "localhost:8000".to_string();
        assert!(config.validate().is_err());

        config.endpoint = "ftp://example.com/query".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_width() {
        let mut config = Config::default();
        config.display.truncate_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_health_url() {
        let mut config = Config::default();
        assert_eq!(
            config.health_url().unwrap().as_str(),
            "http://localhost:8000/health"
        );

        config.endpoint = "https://chat.example.com/api/query".to_string();
        assert_eq!(
            config.health_url().unwrap().as_str(),
            "https://chat.example.com/api/health"
        );

        config.endpoint = "http://h/api/query/".to_string();
        assert_eq!(config.health_url().unwrap().as_str(), "http://h/api/health");
    }

    #[test]
    fn test_request_timeout() {
        let mut config = Config::default();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(120)));
        config.request_timeout_secs = 0;
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_load_missing_custom_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("absent.json");
        let config = Config::load(&path.to_string_lossy()).unwrap();
        assert_eq!(config.endpoint, default_endpoint());
        // Templates are only written for the default path
        assert!(!path.exists());
    }

    #[test]
    fn test_load_invalid_json_falls_back() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let config = Config::load(&path.to_string_lossy()).unwrap();
        assert_eq!(config.request_timeout_secs, 120);
    }

    #[test]
    fn test_save_and_load_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("repochat.json");
        let path = path.to_string_lossy().to_string();

        let mut config = Config::default();
        config.default_repo_url = Some("https://github.com/acme/widgets".to_string());
        config.request_timeout_secs = 30;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(
            loaded.default_repo_url.as_deref(),
            Some("https://github.com/acme/widgets")
        );
        assert_eq!(loaded.request_timeout_secs, 30);
    }
}
