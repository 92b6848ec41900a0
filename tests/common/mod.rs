//! Common test utilities for Keychat
//!
//! Shared fixtures and helpers used across the integration tests.

#![allow(dead_code)]

use keychat::{AppState, ChatParams, Config, Credential};

/// Test configuration constants
pub mod constants {
    /// API key the mock server accepts
    pub const TEST_API_KEY: &str = "sk-test-valid";
    /// API key the mock server rejects
    pub const REVOKED_API_KEY: &str = "sk-test-revoked";
    /// Model used in chat tests
    pub const TEST_MODEL: &str = "gpt-4o-mini";
    /// System prompt used in chat tests
    pub const TEST_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
}

/// Configuration pointing at a mock server
pub fn test_config(server_uri: &str) -> Config {
    let mut config = Config::with_api_url(format!("{}/v1", server_uri));
    config.validate_timeout_seconds = 2;
    config.chat_timeout_seconds = 2;
    config
}

/// Application state with a real OpenAI client bound to `key`
pub fn test_state(server_uri: &str, key: &str) -> AppState {
    let credential = Credential::new(key).expect("test key is not blank");
    AppState::new(test_config(server_uri), Some(&credential)).expect("state builds")
}

/// Chat parameters used by the chat tests
pub fn test_params() -> ChatParams {
    ChatParams::new(constants::TEST_MODEL, 256, 0.7)
}
