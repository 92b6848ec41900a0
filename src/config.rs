//! Configuration management for Keychat
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! picked up by the binary before this runs).

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Default system prompt seeded into every new session
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable text
    Text,
    /// One JSON object per line
    Json,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API URL
    pub openai_api_url: String,
    /// OpenAI API key, if present in the environment
    pub openai_api_key: Option<String>,

    /// Bound on the key validation request (in seconds)
    pub validate_timeout_seconds: u64,
    /// Bound on a whole chat completion request, streaming included (in seconds)
    pub chat_timeout_seconds: u64,
    /// Bound on establishing a connection (in seconds)
    pub connect_timeout_seconds: u64,

    /// Model used when the shell does not choose one
    pub default_model: String,
    /// Completion token bound used when the shell does not choose one
    pub default_max_tokens: u32,
    /// Sampling temperature used when the shell does not choose one
    pub default_temperature: f32,
    /// System message for new sessions
    pub system_prompt: String,

    /// User-Agent sent with every provider request
    pub user_agent: String,

    /// Log output format
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            openai_api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            openai_api_key: env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),

            validate_timeout_seconds: env::var("VALIDATE_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid VALIDATE_TIMEOUT_SECONDS")?,
            chat_timeout_seconds: env::var("CHAT_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .context("Invalid CHAT_TIMEOUT_SECONDS")?,
            connect_timeout_seconds: env::var("CONNECT_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid CONNECT_TIMEOUT_SECONDS")?,

            default_model: env::var("KEYCHAT_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            default_max_tokens: env::var("KEYCHAT_MAX_TOKENS")
                .unwrap_or_else(|_| "512".to_string())
                .parse()
                .context("Invalid KEYCHAT_MAX_TOKENS")?,
            default_temperature: env::var("KEYCHAT_TEMPERATURE")
                .unwrap_or_else(|_| "0.7".to_string())
                .parse()
                .context("Invalid KEYCHAT_TEMPERATURE")?,
            system_prompt: env::var("KEYCHAT_SYSTEM_PROMPT")
                .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string()),

            user_agent: env::var("KEYCHAT_USER_AGENT")
                .unwrap_or_else(|_| format!("keychat/{}", env!("CARGO_PKG_VERSION"))),

            log_format: match env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        })
    }

    /// Configuration pointing at a specific API URL with defaults for everything else
    ///
    /// Used by tests and by callers that embed the library without an environment.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            openai_api_url: api_url.into().trim_end_matches('/').to_string(),
            openai_api_key: None,
            validate_timeout_seconds: 10,
            chat_timeout_seconds: 120,
            connect_timeout_seconds: 10,
            default_model: "gpt-4o-mini".to_string(),
            default_max_tokens: 512,
            default_temperature: 0.7,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_agent: format!("keychat/{}", env!("CARGO_PKG_VERSION")),
            log_format: LogFormat::Text,
        }
    }

    pub fn validate_timeout(&self) -> Duration {
        Duration::from_secs(self.validate_timeout_seconds)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment mutation is process-wide, so everything that touches it lives in one test.
    #[test]
    fn test_default_values_and_overrides() {
        for var in [
            "OPENAI_API_URL",
            "OPENAI_API_KEY",
            "VALIDATE_TIMEOUT_SECONDS",
            "CHAT_TIMEOUT_SECONDS",
            "KEYCHAT_MODEL",
            "LOG_FORMAT",
        ] {
            env::remove_var(var);
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.openai_api_url, "https://api.openai.com/v1");
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.validate_timeout_seconds, 10);
        assert_eq!(config.chat_timeout_seconds, 120);
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.user_agent.starts_with("keychat/"));

        env::set_var("OPENAI_API_URL", "http://localhost:9999/v1/");
        env::set_var("OPENAI_API_KEY", "   ");
        env::set_var("CHAT_TIMEOUT_SECONDS", "30");
        env::set_var("LOG_FORMAT", "json");

        let config = Config::from_env().unwrap();
        assert_eq!(config.openai_api_url, "http://localhost:9999/v1");
        assert!(config.openai_api_key.is_none(), "blank key must be ignored");
        assert_eq!(config.chat_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Json);

        env::set_var("VALIDATE_TIMEOUT_SECONDS", "soon");
        assert!(Config::from_env().is_err());

        for var in [
            "OPENAI_API_URL",
            "OPENAI_API_KEY",
            "VALIDATE_TIMEOUT_SECONDS",
            "CHAT_TIMEOUT_SECONDS",
            "LOG_FORMAT",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_with_api_url_strips_trailing_slash() {
        let config = Config::with_api_url("http://127.0.0.1:8080/v1/");
        assert_eq!(config.openai_api_url, "http://127.0.0.1:8080/v1");
        assert_eq!(config.validate_timeout(), Duration::from_secs(10));
    }
}
