//! CLI command implementations.

pub mod chat;
pub mod key;
pub mod output;

use anyhow::anyhow;
use dialoguer::{theme::ColorfulTheme, Password};
use keychat::{AppError, AppResult, Config, Credential};
use tracing::debug;

/// Resolve the API key from the environment, or from a masked prompt.
///
/// With `force_prompt` the environment is ignored.
pub fn resolve_credential(config: &Config, force_prompt: bool) -> AppResult<Credential> {
    let env_value = if force_prompt {
        None
    } else {
        config.openai_api_key.clone()
    };

    if env_value.is_some() {
        debug!("Using API key from environment");
    }

    Credential::resolve(env_value, || {
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt("OpenAI API key")
            .allow_empty_password(true)
            .interact()
            .map_err(|e| AppError::Internal(anyhow!("Failed to read API key: {}", e)))
    })
}
