//! Assistant endpoint configuration.

use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding the assistant base URL.
pub const ASSISTANT_URL_ENV: &str = "DYNABLOCKS_ASSISTANT_URL";

/// Errors in assistant configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid duration `{value}`: {source}")]
    InvalidDuration {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("base_url must start with http:// or https://, got `{0}`")]
    InvalidUrl(String),
}

/// Where and how to reach the assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    /// Scheme and host of the application
    pub base_url: String,

    /// Path of the chat endpoint
    pub chat_path: String,

    /// Path of the field help endpoint
    pub field_help_path: String,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            chat_path: "/api/ai/".to_string(),
            field_help_path: "/api/ai/field-help/".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl AssistantConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Read configuration from JSON, with defaults for absent keys and
    /// [`ASSISTANT_URL_ENV`] as the fallback base URL.
    ///
    /// ```json
    /// {
    ///   "base_url": "https://docs.example.com",
    ///   "chat_path": "/api/ai/",
    ///   "field_help_path": "/api/ai/field-help/",
    ///   "timeout": "15s"
    /// }
    /// ```
    pub fn from_json(config: &JsonValue) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let base_url = config["base_url"]
            .as_str()
            .map(str::to_string)
            .or_else(|| std::env::var(ASSISTANT_URL_ENV).ok())
            .unwrap_or(defaults.base_url);

        let timeout = match config["timeout"].as_str() {
            Some(value) => humantime::parse_duration(value).map_err(|source| {
                ConfigError::InvalidDuration {
                    value: value.to_string(),
                    source,
                }
            })?,
            None => defaults.timeout,
        };

        let parsed = Self {
            base_url,
            chat_path: config["chat_path"]
                .as_str()
                .map(str::to_string)
                .unwrap_or(defaults.chat_path),
            field_help_path: config["field_help_path"]
                .as_str()
                .map(str::to_string)
                .unwrap_or(defaults.field_help_path),
            timeout,
        };
        parsed.validate()?;
        Ok(parsed)
    }

    /// Configuration from the environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_json(&JsonValue::Null)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.base_url.clone()));
        }
        Ok(())
    }

    pub fn chat_url(&self) -> String {
        join_url(&self.base_url, &self.chat_path)
    }

    pub fn field_help_url(&self) -> String {
        join_url(&self.base_url, &self.field_help_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
