//! Core message types
//!
//! Roles, transcript messages and the chat completion request body.

use serde::{Deserialize, Serialize};

/// Role of a message participant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message providing instructions or context
    System,
    /// User message from the human
    User,
    /// Assistant message from the AI
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A transcript message with role and content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// The role of the message author
    pub role: Role,
    /// The text content of the message
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Per-turn generation parameters chosen by the shell
///
/// Range checks are the caller's responsibility.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatParams {
    /// Model identifier
    pub model: String,
    /// Upper bound on completion tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl ChatParams {
    pub fn new(model: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            temperature,
        }
    }
}

/// Chat completion request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Build a request for the given parameters and transcript
    pub fn new(params: &ChatParams, messages: Vec<Message>) -> Self {
        Self {
            model: params.model.clone(),
            messages,
            max_tokens: Some(params.max_tokens),
            temperature: Some(params.temperature),
            stream: false,
        }
    }

    /// Same request with the streaming flag set
    pub fn streaming(&self) -> Self {
        Self {
            stream: true,
            ..self.clone()
        }
    }

    /// Same request with the streaming flag cleared
    pub fn blocking(&self) -> Self {
        Self {
            stream: false,
            ..self.clone()
        }
    }
}
