//! Chat session engine
//!
//! Runs one conversational turn against a session: appends the user message
//! and an assistant placeholder, streams the reply into the placeholder and
//! falls back to a single blocking completion when the stream is unusable.
//! Network and extraction failures never escape a turn; they end up as the
//! assistant message text.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::normalize::{extract_completion_text, StreamShape, EXTRACTION_FAILED_TEXT};
use super::session::Session;
use super::types::{ChatParams, ChatRequest};
use crate::error::{AppError, AppResult, ErrorKind};
use crate::provider::{ChatTransport, StreamError};
use crate::telemetry;

/// Prefix of the assistant message written when the blocking call fails
pub const ERROR_REPLY_PREFIX: &str = "Error calling the API";

/// Assistant message written when a turn is cancelled before any text arrived
pub const CANCELLED_TEXT: &str = "[Response cancelled]";

/// Receives progress of a turn as it happens
pub trait TurnObserver {
    /// A fragment was appended; `content` is the reply so far
    fn on_fragment(&mut self, _fragment: &str, _content: &str) {}

    /// The stream was abandoned and a blocking request is about to be made
    fn on_fallback(&mut self, _reason: &str) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl TurnObserver for NoopObserver {}

/// Where the final assistant content came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// Concatenated stream fragments
    Streamed,
    /// Blocking fallback response
    Blocking,
    /// Blocking response without extractable text; sentinel stored
    Extraction,
    /// Blocking fallback failed; error description stored
    Failed(ErrorKind),
    /// Cancelled by the caller
    Cancelled,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplySource::Streamed => "streamed",
            ReplySource::Blocking => "blocking",
            ReplySource::Extraction => "extraction_failed",
            ReplySource::Failed(_) => "failed",
            ReplySource::Cancelled => "cancelled",
        }
    }
}

/// Summary of one completed turn
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub source: ReplySource,
    /// Fragments received from the stream (including ones discarded by a fallback)
    pub fragments: usize,
    /// Why the stream was abandoned, if it was
    pub fallback_reason: Option<String>,
    pub elapsed: Duration,
}

enum StreamOutcome {
    Completed(usize),
    Failed { fragments: usize, error: AppError },
    Cancelled(usize),
}

/// Drives conversational turns through a transport
#[derive(Clone)]
pub struct ChatEngine {
    transport: Option<Arc<dyn ChatTransport>>,
}

impl ChatEngine {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    /// Engine without a transport; every `send` fails with `ClientNotConfigured`
    pub fn unconfigured() -> Self {
        Self { transport: None }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Run one turn.
    ///
    /// Returns `Err` only for precondition failures (empty prompt, missing
    /// transport), in which case the session is left untouched. Otherwise the
    /// session gains exactly two messages and ends with a non-empty assistant
    /// message.
    #[instrument(skip_all, fields(session_id = %session.id(), model = %params.model))]
    pub async fn send<O>(
        &self,
        session: &mut Session,
        user_text: &str,
        params: &ChatParams,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> AppResult<TurnReport>
    where
        O: TurnObserver + ?Sized,
    {
        if user_text.trim().is_empty() {
            return Err(AppError::EmptyPrompt);
        }
        let transport = self
            .transport
            .as_deref()
            .ok_or(AppError::ClientNotConfigured)?;

        let started = Instant::now();

        session.push_user(user_text);
        let request = ChatRequest::new(params, session.messages().to_vec());
        session.begin_reply();

        info!(
            provider = transport.name(),
            messages = request.messages.len(),
            "Starting chat turn"
        );

        let outcome = stream_reply(transport, &request, session, observer, cancel).await;

        let (fragments, reason) = match outcome {
            StreamOutcome::Completed(fragments) if fragments > 0 => {
                return Ok(finish(session, params, ReplySource::Streamed, fragments, None, started));
            }
            StreamOutcome::Cancelled(fragments) => {
                if session.reply().is_empty() {
                    session.set_reply(CANCELLED_TEXT);
                }
                return Ok(finish(session, params, ReplySource::Cancelled, fragments, None, started));
            }
            StreamOutcome::Completed(fragments) => {
                (fragments, "stream produced no text".to_string())
            }
            StreamOutcome::Failed { fragments, error } => {
                warn!(error = %error, fragments, "Streaming failed");
                (fragments, error.user_message())
            }
        };

        info!(reason = %reason, "Falling back to blocking completion");
        session.set_reply(String::new());
        observer.on_fallback(&reason);

        let source = blocking_reply(transport, &request, session, cancel).await;
        Ok(finish(session, params, source, fragments, Some(reason), started))
    }
}

/// Consume the stream into the placeholder, in arrival order
async fn stream_reply<O>(
    transport: &dyn ChatTransport,
    request: &ChatRequest,
    session: &mut Session,
    observer: &mut O,
    cancel: &CancellationToken,
) -> StreamOutcome
where
    O: TurnObserver + ?Sized,
{
    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return StreamOutcome::Cancelled(0),
        opened = transport.stream_chat(request) => opened,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(error) => return StreamOutcome::Failed { fragments: 0, error },
    };

    let mut fragments = 0;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return StreamOutcome::Cancelled(fragments),
            next = stream.next() => next,
        };

        match next {
            None => return StreamOutcome::Completed(fragments),
            Some(Ok(StreamShape::ProviderError { error })) => {
                return StreamOutcome::Failed {
                    fragments,
                    error: StreamError::ProviderError {
                        code: error.code_str(),
                        message: error.message,
                    }
                    .into(),
                };
            }
            Some(Ok(shape)) => match shape.delta_text() {
                Some(fragment) => {
                    fragments += 1;
                    let content = session.append_reply(fragment);
                    observer.on_fragment(fragment, content);
                }
                None => debug!("Stream event without text"),
            },
            Some(Err(error)) => return StreamOutcome::Failed { fragments, error },
        }
    }
}

/// One blocking request; the outcome is always written into the placeholder
async fn blocking_reply(
    transport: &dyn ChatTransport,
    request: &ChatRequest,
    session: &mut Session,
    cancel: &CancellationToken,
) -> ReplySource {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            session.set_reply(CANCELLED_TEXT);
            return ReplySource::Cancelled;
        }
        result = transport.complete_chat(request) => result,
    };

    match result {
        Ok(shape) => match extract_completion_text(&shape) {
            Ok(text) => {
                session.set_reply(text);
                ReplySource::Blocking
            }
            Err(e) => {
                warn!(error = %e, "No text in completion response");
                session.set_reply(EXTRACTION_FAILED_TEXT);
                ReplySource::Extraction
            }
        },
        Err(e) => {
            error!(error = %e, kind = %e.kind(), "Blocking completion failed");
            session.set_reply(format!("{}: {}", ERROR_REPLY_PREFIX, e.user_message()));
            ReplySource::Failed(e.kind())
        }
    }
}

fn finish(
    session: &mut Session,
    params: &ChatParams,
    source: ReplySource,
    fragments: usize,
    fallback_reason: Option<String>,
    started: Instant,
) -> TurnReport {
    // Every turn must end with visible assistant content
    if session.reply().is_empty() {
        session.set_reply(EXTRACTION_FAILED_TEXT);
    }

    let elapsed = started.elapsed();
    telemetry::record_turn(source.as_str(), &params.model, elapsed.as_secs_f64());
    telemetry::record_fragments(&params.model, fragments as u64);

    info!(
        source = source.as_str(),
        fragments,
        reply_chars = session.reply().chars().count(),
        duration_ms = %format!("{:.2}", elapsed.as_secs_f64() * 1000.0),
        "Chat turn completed"
    );

    TurnReport {
        source,
        fragments,
        fallback_reason,
        elapsed,
    }
}
