//! Chat transport abstraction
//!
//! Defines the interface the chat engine talks to, so the engine can run
//! against the real provider or against a scripted transport in tests.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::chat::normalize::{CompletionShape, StreamShape};
use crate::chat::types::ChatRequest;
use crate::error::AppResult;

/// Stream of decoded provider events, in arrival order
pub type EventStream = Pin<Box<dyn Stream<Item = AppResult<StreamShape>> + Send>>;

/// Errors that can occur while reading an event stream
#[derive(Debug, Error)]
pub enum StreamError {
    /// Stream ended in the middle of an event
    #[error("Stream connection closed unexpectedly")]
    ConnectionClosed,

    /// Provider returned an error in the stream
    #[error("Provider error: {message}")]
    ProviderError {
        /// Error message from the provider
        message: String,
        /// Optional error code
        code: Option<String>,
    },
}

/// Trait defining the interface for chat completion providers
///
/// # Security
///
/// Implementations MUST never log the API key or the Authorization header.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Provider name for logging and metrics
    fn name(&self) -> &'static str;

    /// Chat completions (streaming)
    ///
    /// Opens the stream and returns decoded events. Errors opening the stream
    /// (status, connect) are returned directly; errors while reading are
    /// yielded as stream items.
    async fn stream_chat(&self, request: &ChatRequest) -> AppResult<EventStream>;

    /// Chat completions (non-streaming)
    ///
    /// Sends the request and decodes the whole response document.
    async fn complete_chat(&self, request: &ChatRequest) -> AppResult<CompletionShape>;
}
