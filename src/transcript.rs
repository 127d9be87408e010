//! Transcript store
//!
//! Append-only, in-memory record of the current session. The only bulk
//! mutations are `clear` (reset) and `replace_all` (loading a saved
//! conversation).

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Type-specific payload of a message
///
/// Options only exist on questions and results only on result messages.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Plain,
    Question { options: Vec<String> },
    Results { results: Value },
    Reset,
}

impl MessageBody {
    /// Wire tag used by the backend's `message_type` column
    pub fn type_tag(&self) -> &'static str {
        match self {
            MessageBody::Plain => "message",
            MessageBody::Question { .. } => "question",
            MessageBody::Results { .. } => "results",
            MessageBody::Reset => "reset",
        }
    }
}

/// A message that has not been stamped yet
///
/// The state machine produces drafts so it never has to read the clock.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub role: Role,
    pub content: String,
    pub body: MessageBody,
}

impl MessageDraft {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            body: MessageBody::Plain,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            body: MessageBody::Plain,
        }
    }

    pub fn with_body(mut self, body: MessageBody) -> Self {
        self.body = body;
        self
    }

    pub fn stamp(self, timestamp: DateTime<Utc>) -> Message {
        Message {
            role: self.role,
            content: self.content,
            timestamp,
            body: self.body,
        }
    }
}

/// One turn in the transcript
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub body: MessageBody,
}

/// Ordered messages of the current session
#[derive(Debug, Clone, Default)]
pub struct TranscriptStore {
    messages: Vec<Message>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn first_user_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.role == Role::User)
    }
}
