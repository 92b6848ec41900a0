//! Keychat - OpenAI API key tester and streaming chat client
//!
//! This library provides the core functionality for the `keychat` binary.
//! It validates API keys against the models endpoint and runs chat sessions
//! with streaming replies and a blocking fallback.

pub mod chat;
pub mod config;
pub mod credential;
pub mod error;
pub mod provider;
pub mod streaming;
pub mod telemetry;
pub mod validator;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub use crate::chat::{ChatEngine, ChatParams, Message, Role, Session, TurnReport};
pub use crate::config::Config;
pub use crate::credential::Credential;
pub use crate::error::{AppError, AppResult};
pub use crate::provider::{ChatTransport, OpenAIClient};
pub use crate::validator::{KeyStatus, KeyValidator, ValidationResult};

/// Application state shared by the shell commands
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Key validator for the configured API URL
    pub validator: Arc<KeyValidator>,
    /// Chat engine; unconfigured when no credential was supplied
    pub engine: ChatEngine,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config, credential: Option<&Credential>) -> Result<Self> {
        // Per-request timeouts are applied by the validator and the chat client
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .connect_timeout(config.connect_timeout())
            .build()?;

        let validator = Arc::new(KeyValidator::new(http_client.clone(), &config));

        let engine = match credential {
            Some(credential) => {
                let transport: Arc<dyn ChatTransport> =
                    Arc::new(OpenAIClient::new(http_client.clone(), &config, credential)?);
                ChatEngine::new(transport)
            }
            None => ChatEngine::unconfigured(),
        };

        Ok(Self {
            config,
            start_time: Instant::now(),
            validator,
            engine,
        })
    }

    /// Create an application state with a custom chat transport
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(config: Config, transport: Arc<dyn ChatTransport>) -> Self {
        let http_client = reqwest::Client::new();
        let validator = Arc::new(KeyValidator::new(http_client.clone(), &config));

        Self {
            config,
            start_time: Instant::now(),
            validator,
            engine: ChatEngine::new(transport),
        }
    }

    /// Default chat parameters from configuration
    pub fn default_params(&self) -> ChatParams {
        ChatParams::new(
            self.config.default_model.clone(),
            self.config.default_max_tokens,
            self.config.default_temperature,
        )
    }

    /// Fresh session seeded with the configured system prompt
    pub fn new_session(&self) -> Session {
        Session::new(self.config.system_prompt.clone())
    }
}
