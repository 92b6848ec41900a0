//! Error types for Keychat
//!
//! This module defines the error taxonomy used throughout the library. Errors
//! keep distinguishable kinds internally even though the shell ultimately
//! flattens them into a single message line.

use thiserror::Error;

use crate::chat::normalize::ExtractionError;
use crate::provider::StreamError;

/// Coarse error category, used for user-facing grouping and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing credential or client; caught before any network call
    Configuration,
    /// Timeout, connection failure, broken stream
    Transport,
    /// HTTP 401/403
    Authorization,
    /// HTTP 429
    RateLimit,
    /// Response received but no text could be found in it
    Extraction,
    /// Anything else
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Transport => "transport",
            ErrorKind::Authorization => "authorization",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No API key provided")]
    MissingCredential,

    #[error("API key contains characters that cannot be sent in a header")]
    MalformedCredential,

    #[error("API client is not configured")]
    ClientNotConfigured,

    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Unauthorized (HTTP 401): the API key is invalid or revoked")]
    Unauthorized,

    #[error("Forbidden (HTTP 403): the key may lack permissions")]
    Forbidden,

    #[error("Rate limited (HTTP 429): too many requests for this key")]
    RateLimited,

    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout
        } else {
            AppError::Transport(err)
        }
    }
}

impl AppError {
    /// Map a non-success HTTP status to the matching error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => AppError::Unauthorized,
            403 => AppError::Forbidden,
            429 => AppError::RateLimited,
            _ => AppError::Upstream { status, body },
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::MissingCredential
            | AppError::MalformedCredential
            | AppError::ClientNotConfigured
            | AppError::Config(_) => ErrorKind::Configuration,
            AppError::Timeout | AppError::Transport(_) | AppError::Stream(_) => {
                ErrorKind::Transport
            }
            AppError::Unauthorized | AppError::Forbidden => ErrorKind::Authorization,
            AppError::RateLimited => ErrorKind::RateLimit,
            AppError::Extraction(_) => ErrorKind::Extraction,
            AppError::Upstream { .. }
            | AppError::EmptyPrompt
            | AppError::InvalidTranscript(_)
            | AppError::Json(_)
            | AppError::Io(_)
            | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Flattened single-line message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            AppError::MissingCredential => {
                "Please provide an API key (or set OPENAI_API_KEY).".to_string()
            }
            AppError::ClientNotConfigured => {
                "The API client is not configured. Provide an API key first.".to_string()
            }
            AppError::Upstream { status, body } if body.is_empty() => {
                format!("Request failed (HTTP {})", status)
            }
            AppError::Upstream { status, body } => {
                format!("Request failed (HTTP {}): {}", status, truncate(body, 300))
            }
            other => other.to_string(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
