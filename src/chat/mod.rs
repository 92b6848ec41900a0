//! Chat module
//!
//! Conversation state, request and response types, response normalization
//! and the engine that runs a turn.

pub mod engine;
pub mod normalize;
pub mod session;
pub mod types;

pub use engine::{
    ChatEngine, NoopObserver, ReplySource, TurnObserver, TurnReport, CANCELLED_TEXT,
    ERROR_REPLY_PREFIX,
};
pub use normalize::{
    extract_completion_text, CompletionShape, ExtractionError, StreamShape, EXTRACTION_FAILED_TEXT,
};
pub use session::Session;
pub use types::{ChatParams, ChatRequest, Message, Role};
