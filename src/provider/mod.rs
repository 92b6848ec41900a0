//! Provider module
//!
//! HTTP plumbing towards OpenAI-compatible chat providers.

pub mod headers;
pub mod openai;
#[cfg(any(test, feature = "test-utils"))]
pub mod scripted;
pub mod transport;

pub use openai::OpenAIClient;
#[cfg(any(test, feature = "test-utils"))]
pub use scripted::{CompletionScript, ScriptedFailure, ScriptedTransport, StreamScript};
pub use transport::{ChatTransport, EventStream, StreamError};
