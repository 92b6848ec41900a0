//! Conversation transcript
//!
//! A session owns an ordered transcript that always starts with exactly one
//! system message. It grows by appending; the only in-place edit is to the
//! trailing assistant placeholder while a reply is being produced. Sessions
//! are plain owned values, one per conversation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::types::{Message, Role};
use crate::config::DEFAULT_SYSTEM_PROMPT;
use crate::error::{AppError, AppResult};

/// A single conversation
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    system_prompt: String,
    messages: Vec<Message>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl Session {
    /// Create a session seeded with a system message
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            messages: vec![Message::system(system_prompt.clone())],
            system_prompt,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The transcript in conversation order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when only the system message is present
    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Discard all history and start over with a fresh system message
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(Message::system(self.system_prompt.clone()));
        debug!(session_id = %self.id, "Session reset");
    }

    /// Serialize the transcript as a JSON array of `{role, content}` records
    pub fn export(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(&self.messages)?)
    }

    /// Rebuild a session from an exported document
    ///
    /// The document must start with exactly one system message, followed by
    /// user and assistant messages in alternation.
    pub fn from_export(document: &str) -> AppResult<Self> {
        let messages: Vec<Message> = serde_json::from_str(document)?;

        match messages.first() {
            Some(first) if first.role == Role::System => {}
            _ => {
                return Err(AppError::InvalidTranscript(
                    "transcript must start with a system message".to_string(),
                ))
            }
        }
        if messages.iter().skip(1).any(|m| m.role == Role::System) {
            return Err(AppError::InvalidTranscript(
                "transcript contains more than one system message".to_string(),
            ));
        }
        if messages.get(1).map(|m| m.role) == Some(Role::Assistant) {
            return Err(AppError::InvalidTranscript(
                "assistant message without a preceding user message".to_string(),
            ));
        }
        if let Some(pair) = messages.windows(2).find(|pair| pair[0].role == pair[1].role) {
            return Err(AppError::InvalidTranscript(format!(
                "two consecutive {} messages",
                pair[0].role
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            system_prompt: messages[0].content.clone(),
            messages,
        })
    }

    /// Write the export into `dir` as `chat_history_<timestamp>.json`
    pub fn export_to_file(&self, dir: &Path) -> AppResult<PathBuf> {
        let document = self.export()?;
        let file_name = format!("chat_history_{}.json", Utc::now().format("%Y%m%d_%H%M%S"));
        let path = dir.join(file_name);
        std::fs::write(&path, document)?;
        info!(session_id = %self.id, path = %path.display(), messages = self.len(), "Transcript exported");
        Ok(path)
    }

    // ------------------------------------------------------------------
    // Turn bookkeeping, driven by the chat engine
    // ------------------------------------------------------------------

    pub(crate) fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Reserve the transcript slot for the reply
    pub(crate) fn begin_reply(&mut self) {
        self.messages.push(Message::assistant(String::new()));
    }

    /// Content of the trailing assistant message
    pub(crate) fn reply(&self) -> &str {
        match self.messages.last() {
            Some(message) if message.role == Role::Assistant => &message.content,
            _ => "",
        }
    }

    /// Append a fragment to the placeholder and return the content so far
    pub(crate) fn append_reply(&mut self, fragment: &str) -> &str {
        match self.messages.last_mut() {
            Some(message) if message.role == Role::Assistant => {
                message.content.push_str(fragment);
                &message.content
            }
            _ => "",
        }
    }

    /// Overwrite the placeholder content
    pub(crate) fn set_reply(&mut self, content: impl Into<String>) {
        if let Some(message) = self.messages.last_mut() {
            if message.role == Role::Assistant {
                message.content = content.into();
            }
        }
    }
}
