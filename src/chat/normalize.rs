//! Response normalization
//!
//! Providers (and provider versions) disagree on where the generated text
//! lives. The accepted wire shapes are enumerated here as tagged unions and
//! decoded with serde; extraction is a plain match over the known arms with an
//! explicit "not recognized" outcome.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::types::Role;

/// Content stored in the assistant message when a successful reply has no usable text
pub const EXTRACTION_FAILED_TEXT: &str = "[No text could be extracted from the model response]";

/// Probes for stream events that did not decode into a typed arm, in order of preference
const DELTA_POINTERS: &[&str] = &["/choices/0/delta/content", "/choices/0/text", "/text"];

/// Probes for completion documents that did not decode into a typed arm
const COMPLETION_POINTERS: &[&str] = &[
    "/choices/0/message/content",
    "/choices/0/text",
    "/output_text",
    "/text",
];

/// Why no text could be taken from a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// None of the known shapes matched
    #[error("response shape not recognized")]
    UnrecognizedShape,
    /// A known shape matched but carried no text (empty choices, null content, tool calls only)
    #[error("response contained no text")]
    NoText,
}

// ============================================================================
// Stream events
// ============================================================================

/// Error object embedded in a stream or body by the provider
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProviderErrorBody {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// String on OpenAI, sometimes numeric on compatible servers
    #[serde(default)]
    pub code: Option<Value>,
}

impl ProviderErrorBody {
    pub fn code_str(&self) -> Option<String> {
        match &self.code {
            Some(Value::String(code)) => Some(code.clone()),
            Some(Value::Number(code)) => Some(code.to_string()),
            _ => None,
        }
    }
}

/// Delta content in a chat stream chunk
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct Delta {
    /// Role (only present in first chunk)
    pub role: Option<Role>,
    /// Content fragment
    pub content: Option<String>,
}

/// A choice in a chat stream chunk
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChunkChoice {
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

/// Chat completion stream chunk (`chat.completion.chunk`)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatChunk {
    pub choices: Vec<ChunkChoice>,
}

/// A choice carrying a plain `text` field (legacy completions endpoint)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TextChoice {
    pub text: String,
}

/// Legacy completion chunk or document (`text_completion`)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TextCompletion {
    pub choices: Vec<TextChoice>,
}

/// One decoded stream event
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StreamShape {
    /// `{"error": {...}}` sent mid-stream
    ProviderError { error: ProviderErrorBody },
    /// `choices[].delta.content`
    ChatChunk(ChatChunk),
    /// `choices[].text`
    LegacyChunk(TextCompletion),
    /// `{"text": "..."}`
    BareText { text: String },
    /// Valid JSON of no known shape
    Unrecognized(Value),
}

impl StreamShape {
    /// Decode one `data:` payload
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Text fragment carried by this event, if any
    ///
    /// Events without text (role-only first chunk, usage-only last chunk,
    /// unknown events) yield `None` and are skipped by the caller.
    pub fn delta_text(&self) -> Option<&str> {
        let text = match self {
            StreamShape::ChatChunk(chunk) => chunk
                .choices
                .first()
                .and_then(|choice| choice.delta.content.as_deref()),
            StreamShape::LegacyChunk(chunk) => {
                chunk.choices.first().map(|choice| choice.text.as_str())
            }
            StreamShape::BareText { text } => Some(text.as_str()),
            StreamShape::ProviderError { .. } => None,
            StreamShape::Unrecognized(value) => probe(value, DELTA_POINTERS),
        };
        text.filter(|t| !t.is_empty())
    }
}

// ============================================================================
// Complete (non-streaming) responses
// ============================================================================

/// A part of multimodal content
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Message content - either plain text or content parts
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Concatenated text of either variant
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Other => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// Message in a completion choice
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChoiceMessage {
    pub role: Option<Role>,
    pub content: Option<MessageContent>,
}

/// A completion choice
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CompletionChoice {
    pub message: ChoiceMessage,
}

/// Chat completion document (`chat.completion`)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatCompletion {
    pub choices: Vec<CompletionChoice>,
}

/// One decoded completion document
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CompletionShape {
    /// `choices[].message.content`
    Chat(ChatCompletion),
    /// `choices[].text`
    Legacy(TextCompletion),
    /// `{"output_text": "..."}`
    Output { output_text: String },
    /// Valid JSON of no known shape
    Unrecognized(Value),
}

/// Take the reply text out of a complete response
pub fn extract_completion_text(shape: &CompletionShape) -> Result<String, ExtractionError> {
    let text = match shape {
        CompletionShape::Chat(completion) => completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .map(MessageContent::as_text),
        CompletionShape::Legacy(completion) => {
            completion.choices.first().map(|choice| choice.text.clone())
        }
        CompletionShape::Output { output_text } => Some(output_text.clone()),
        CompletionShape::Unrecognized(value) => {
            return probe(value, COMPLETION_POINTERS)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .ok_or(ExtractionError::UnrecognizedShape);
        }
    };

    text.filter(|t| !t.is_empty()).ok_or(ExtractionError::NoText)
}

fn probe<'a>(value: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers
        .iter()
        .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
}
