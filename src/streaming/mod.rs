//! SSE (Server-Sent Events) line handling
//!
//! Provides buffering and line classification for the event stream returned
//! by the chat completions endpoint when `stream: true` is requested, and the
//! decoder that turns a byte stream into provider events.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::chat::normalize::StreamShape;
use crate::error::AppError;
use crate::provider::{EventStream, StreamError};

/// Payload marker that terminates an OpenAI event stream
pub const DONE_MARKER: &str = "[DONE]";

/// Buffer for accumulating incomplete SSE lines across chunk boundaries.
///
/// SSE data arrives as byte chunks that may not align with line boundaries.
/// This buffer accumulates incomplete lines until a complete line (ending with \n)
/// is available for processing.
///
/// # Example
/// ```
/// use keychat::streaming::SseLineBuffer;
///
/// let mut buffer = SseLineBuffer::new();
///
/// // First chunk contains partial line
/// let lines1 = buffer.feed(b"data: {\"content\":\"hel");
/// assert!(lines1.is_empty()); // No complete lines yet
///
/// // Second chunk completes the line
/// let lines2 = buffer.feed(b"lo\"}\n");
/// assert_eq!(lines2, vec!["data: {\"content\":\"hello\"}"]);
/// ```
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Raw bytes of the line being accumulated; decoded only once complete
    /// so multi-byte characters split across chunks survive
    incomplete: Vec<u8>,
}

impl SseLineBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self {
            incomplete: Vec::new(),
        }
    }

    /// Feed bytes into the buffer and return any complete lines.
    ///
    /// Complete lines are those ending with `\n`. The newline (and a
    /// preceding `\r`, if any) is stripped from returned lines. Empty lines
    /// are event separators and are not returned.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.incomplete.extend_from_slice(bytes);

        let mut complete_lines = Vec::new();

        while let Some(newline_pos) = self.incomplete.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.incomplete.drain(..=newline_pos).collect();
            let line = decode_line_bytes(&raw[..newline_pos]);

            if !line.is_empty() {
                complete_lines.push(line);
            }
        }

        complete_lines
    }

    /// Check if there's any incomplete data remaining in the buffer.
    pub fn has_incomplete(&self) -> bool {
        !self.incomplete.is_empty()
    }

    /// Take the trailing unterminated line, if any, at end of stream.
    ///
    /// Some servers close the connection right after the last event without
    /// a final newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.incomplete);
        let line = decode_line_bytes(&rest);
        if line.is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

fn decode_line_bytes(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Meaning of one complete SSE line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// `data:` line carrying a JSON payload
    Data(&'a str),
    /// `data: [DONE]`
    Done,
    /// `: comment` keep-alive line
    Comment,
    /// `event:`, `id:`, `retry:` or anything else we don't act on
    Other,
}

/// Classify a complete SSE line
pub fn classify_line(line: &str) -> SseLine<'_> {
    if line.starts_with(':') {
        return SseLine::Comment;
    }

    match line.strip_prefix("data:") {
        Some(rest) => {
            let payload = rest.trim();
            if payload == DONE_MARKER {
                SseLine::Done
            } else {
                SseLine::Data(payload)
            }
        }
        None => SseLine::Other,
    }
}

/// Result of decoding one complete line
enum LineOutcome {
    Event(StreamShape),
    Done,
    Failed(AppError),
    Skip,
}

fn decode_line(line: &str) -> LineOutcome {
    match classify_line(line) {
        SseLine::Done => LineOutcome::Done,
        SseLine::Comment | SseLine::Other => LineOutcome::Skip,
        SseLine::Data(payload) => match StreamShape::parse(payload) {
            Ok(StreamShape::ProviderError { error }) => {
                warn!(message = %error.message, "Provider reported an error mid-stream");
                LineOutcome::Failed(
                    StreamError::ProviderError {
                        code: error.code_str(),
                        message: error.message,
                    }
                    .into(),
                )
            }
            Ok(shape) => LineOutcome::Event(shape),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable stream event");
                LineOutcome::Skip
            }
        },
    }
}

/// Decode a raw SSE byte stream into provider events.
///
/// Events are yielded strictly in arrival order. The stream ends at
/// `data: [DONE]` (anything after it is ignored), at the first read error, or
/// at the first provider error event.
pub fn decode_event_stream<S, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<AppError> + Send + 'static,
{
    let mut bytes = Box::pin(bytes);

    Box::pin(async_stream::stream! {
        let mut buffer = SseLineBuffer::new();
        let mut saw_done = false;

        'read: while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let err: AppError = e.into();
                    yield Err(err);
                    return;
                }
            };

            for line in buffer.feed(&chunk) {
                match decode_line(&line) {
                    LineOutcome::Event(shape) => yield Ok(shape),
                    LineOutcome::Done => {
                        saw_done = true;
                        break 'read;
                    }
                    LineOutcome::Failed(err) => {
                        yield Err(err);
                        return;
                    }
                    LineOutcome::Skip => {}
                }
            }
        }

        if saw_done {
            return;
        }

        if !buffer.has_incomplete() {
            debug!("Stream ended without a [DONE] marker");
            return;
        }

        if let Some(tail) = buffer.finish() {
            match decode_line(&tail) {
                LineOutcome::Event(shape) => yield Ok(shape),
                LineOutcome::Failed(err) => yield Err(err),
                LineOutcome::Done => {}
                LineOutcome::Skip => {
                    if matches!(classify_line(&tail), SseLine::Data(_)) {
                        warn!(tail_len = tail.len(), "Stream ended inside an event");
                        yield Err(AppError::from(StreamError::ConnectionClosed));
                    }
                }
            }
        }
    })
}
