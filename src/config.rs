//! Configuration management for Parlor
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ParlorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for Parlor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,
    /// Login settings
    #[serde(default)]
    pub auth: AuthConfig,
    /// Chat behavior
    #[serde(default)]
    pub chat: ChatConfig,
    /// Models offered by `/models` and accepted by `/model`
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL the endpoint paths are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout applied to every request
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Login settings
///
/// The password is never stored in the file; it comes from
/// `PARLOR_PASSWORD` or an interactive prompt.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Username to log in with; login is skipped when unset
    #[serde(default)]
    pub username: Option<String>,
}

/// What to do with the optimistic user message when a send fails
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnansweredPolicy {
    /// Leave the message in place; the chat reads "sent but unanswered"
    #[default]
    Keep,
    /// Remove the message if it is still the last one of the chat
    Rollback,
}

/// Chat behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model selected at start and used for new chats
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Characters of the first message kept in a derived title
    #[serde(default = "default_title_prefix_chars")]
    pub title_prefix_chars: usize,
    /// Handling of unanswered messages after a failed send
    #[serde(default)]
    pub on_send_failure: UnansweredPolicy,
    /// Ask before deleting a chat
    #[serde(default = "default_confirm_delete")]
    pub confirm_delete: bool,
    /// Optional file mirroring the active chat as an HTML transcript
    #[serde(default)]
    pub transcript_path: Option<PathBuf>,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_title_prefix_chars() -> usize {
    30
}

fn default_confirm_delete() -> bool {
    true
}

fn default_models() -> Vec<String> {
    [
        "gpt-3.5-turbo",
        "gpt-4o",
        "gpt-4o-mini",
        "gpt-4-turbo",
        "claude-3-5-sonnet-20241022",
        "claude-3-haiku-20240307",
        "llama-3.1-8b-instruct",
        "mistral-7b-instruct-v0.2",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            title_prefix_chars: default_title_prefix_chars(),
            on_send_failure: UnansweredPolicy::default(),
            confirm_delete: default_confirm_delete(),
            transcript_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            auth: AuthConfig::default(),
            chat: ChatConfig::default(),
            models: default_models(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ParlorError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ParlorError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("PARLOR_BACKEND_URL") {
            self.backend.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("PARLOR_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.backend.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid PARLOR_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(username) = std::env::var("PARLOR_USERNAME") {
            self.auth.username = if username.trim().is_empty() {
                None
            } else {
                Some(username)
            };
        }

        if let Ok(model) = std::env::var("PARLOR_DEFAULT_MODEL") {
            self.chat.default_model = model;
        }

        if let Ok(path) = std::env::var("PARLOR_TRANSCRIPT_PATH") {
            self.chat.transcript_path = if path.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(base_url) = &cli.backend_url {
            self.backend.base_url = base_url.clone();
        }

        if let Some(model) = &cli.model {
            self.chat.default_model = model.clone();
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Returns
    ///
    /// Returns Ok if configuration is valid
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(
                ParlorError::Config("backend.base_url cannot be empty".to_string()).into(),
            );
        }

        let url = Url::parse(&self.backend.base_url).map_err(|e| {
            ParlorError::Config(format!(
                "Invalid backend.base_url {}: {}",
                self.backend.base_url, e
            ))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ParlorError::Config(format!(
                "backend.base_url must use http or https, got {}",
                url.scheme()
            ))
            .into());
        }

        if self.backend.timeout_seconds == 0 {
            return Err(ParlorError::Config(
                "backend.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.backend.timeout_seconds > 3600 {
            return Err(ParlorError::Config(
                "backend.timeout_seconds must be less than or equal to 3600".to_string(),
            )
            .into());
        }

        if self.chat.default_model.trim().is_empty() {
            return Err(
                ParlorError::Config("chat.default_model cannot be empty".to_string()).into(),
            );
        }

        if self.chat.title_prefix_chars == 0 {
            return Err(ParlorError::Config(
                "chat.title_prefix_chars must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
