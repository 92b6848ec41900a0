//! Scripted chat transport for testing
//!
//! Replays fixed streaming and blocking outcomes so the chat engine can be
//! exercised without a network. Every request is recorded for assertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::transport::{ChatTransport, EventStream, StreamError};
use crate::chat::normalize::{ChatChunk, ChunkChoice, CompletionShape, Delta, StreamShape};
use crate::chat::types::ChatRequest;
use crate::error::{AppError, AppResult};

/// Failure to inject
#[derive(Debug, Clone)]
pub enum ScriptedFailure {
    Timeout,
    Unauthorized,
    RateLimited,
    Upstream(u16),
    Provider(String),
}

impl ScriptedFailure {
    fn to_error(&self) -> AppError {
        match self {
            ScriptedFailure::Timeout => AppError::Timeout,
            ScriptedFailure::Unauthorized => AppError::Unauthorized,
            ScriptedFailure::RateLimited => AppError::RateLimited,
            ScriptedFailure::Upstream(status) => AppError::Upstream {
                status: *status,
                body: String::new(),
            },
            ScriptedFailure::Provider(message) => StreamError::ProviderError {
                message: message.clone(),
                code: None,
            }
            .into(),
        }
    }
}

/// What `stream_chat` does
#[derive(Debug, Clone)]
pub enum StreamScript {
    /// Yield one chat chunk per fragment, then end
    Fragments(Vec<String>),
    /// Yield these raw event documents, then end
    Events(Vec<Value>),
    /// Fail before any event
    FailToOpen(ScriptedFailure),
    /// Yield fragments, then a read error
    FailAfter(Vec<String>, ScriptedFailure),
    /// Yield fragments, then never finish
    Stall(Vec<String>),
}

/// What `complete_chat` does
#[derive(Debug, Clone)]
pub enum CompletionScript {
    /// A chat completion document with this content
    Text(String),
    /// This raw document
    Document(Value),
    /// Fail
    Fail(ScriptedFailure),
    /// Never finish
    Stall,
}

/// Transport that replays scripts
pub struct ScriptedTransport {
    stream: StreamScript,
    completion: CompletionScript,
    stream_calls: AtomicUsize,
    completion_calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

fn chunk(fragment: &str) -> StreamShape {
    StreamShape::ChatChunk(ChatChunk {
        choices: vec![ChunkChoice {
            delta: Delta {
                role: None,
                content: Some(fragment.to_string()),
            },
            finish_reason: None,
        }],
    })
}

impl ScriptedTransport {
    pub fn new(stream: StreamScript, completion: CompletionScript) -> Self {
        Self {
            stream,
            completion,
            stream_calls: AtomicUsize::new(0),
            completion_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Stream the given fragments; the blocking path fails if reached
    pub fn streaming<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            StreamScript::Fragments(fragments.into_iter().map(Into::into).collect()),
            CompletionScript::Fail(ScriptedFailure::Upstream(500)),
        )
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: &ChatRequest) {
        self.requests.lock().unwrap().push(request.clone());
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn stream_chat(&self, request: &ChatRequest) -> AppResult<EventStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.record(&request.streaming());

        let events: Vec<AppResult<StreamShape>> = match &self.stream {
            StreamScript::FailToOpen(failure) => return Err(failure.to_error()),
            StreamScript::Fragments(fragments) => {
                fragments.iter().map(|f| Ok(chunk(f))).collect()
            }
            StreamScript::Events(documents) => documents
                .iter()
                .map(|d| serde_json::from_value(d.clone()).map_err(AppError::from))
                .collect(),
            StreamScript::FailAfter(fragments, failure) => fragments
                .iter()
                .map(|f| Ok(chunk(f)))
                .chain(std::iter::once(Err(failure.to_error())))
                .collect(),
            StreamScript::Stall(fragments) => {
                let head: Vec<AppResult<StreamShape>> =
                    fragments.iter().map(|f| Ok(chunk(f))).collect();
                let stream = futures::StreamExt::chain(
                    futures::stream::iter(head),
                    futures::stream::pending(),
                );
                return Ok(Box::pin(stream));
            }
        };

        Ok(Box::pin(futures::stream::iter(events)))
    }

    async fn complete_chat(&self, request: &ChatRequest) -> AppResult<CompletionShape> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        self.record(&request.blocking());

        match &self.completion {
            CompletionScript::Text(text) => Ok(serde_json::from_value(serde_json::json!({
                "object": "chat.completion",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
            }))?),
            CompletionScript::Document(document) => Ok(serde_json::from_value(document.clone())?),
            CompletionScript::Fail(failure) => Err(failure.to_error()),
            CompletionScript::Stall => futures::future::pending().await,
        }
    }
}
