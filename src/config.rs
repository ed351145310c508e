// Configuration for gfilesearch.
//
// Service settings come from `~/.config/gfilesearch/config.toml` when it
// exists. The API key never lives in that file: it is read from
// `GOOGLE_API_KEY` (optionally via `.env`) or entered interactively.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Base URL of the Generative Language API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model used to answer queries.
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request timeout. The HTTP client default applies when unset.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            request_timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("gfilesearch"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Secret API key scoped to one session. `Debug` is redacted so the key
/// cannot leak through logs or error reports.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into().trim().to_string())
    }

    /// Read the key from the environment, loading `.env` first.
    pub fn from_env() -> Option<Self> {
        dotenv::dotenv().ok();
        std::env::var(API_KEY_ENV)
            .ok()
            .map(ApiKey::new)
            .filter(|k| !k.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw key, for placing into a request header and nothing else.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_config_partial_file() {
        let config = Config::parse("model = \"gemini-2.5-pro\"\nrequest_timeout_secs = 90\n").unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.base_url, "https://generativelanguage.googleapis.com");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("AIzaSecretValue");
        let printed = format!("{:?}", key);
        assert!(!printed.contains("AIzaSecretValue"));
        assert_eq!(key.expose(), "AIzaSecretValue");
    }

    #[test]
    fn test_api_key_trims_whitespace() {
        assert!(ApiKey::new("   ").is_empty());
        assert_eq!(ApiKey::new(" abc\n").expose(), "abc");
    }
}
