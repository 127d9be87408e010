//! Request and response types for the backend HTTP API

use crate::transcript::{Message, MessageBody, Role};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ProtocolError;

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct FuzzyRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveRequest<'a> {
    pub title: &'a str,
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmptyRequest {}

// ============================================================================
// Chat turn
// ============================================================================

/// Classified agent reply to a chat turn
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawReply")]
pub struct AgentReply {
    pub content: String,
    /// Backend asks the client to wipe its transcript before showing this reply
    pub clear_history: bool,
    pub kind: ReplyKind,
}

/// Response type tag; anything unrecognized is `Plain`
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyKind {
    Question { options: Vec<String> },
    Results { results: Value },
    Reset,
    Plain,
}

#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    should_clear_history: bool,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    results: Option<Value>,
}

impl From<RawReply> for AgentReply {
    fn from(raw: RawReply) -> Self {
        let kind = match raw.kind.as_deref() {
            Some("question") => ReplyKind::Question {
                options: raw.options.unwrap_or_default(),
            },
            Some("results") => ReplyKind::Results {
                results: raw.results.unwrap_or(Value::Null),
            },
            Some("reset") => ReplyKind::Reset,
            _ => ReplyKind::Plain,
        };
        Self {
            content: raw.content,
            clear_history: raw.should_clear_history,
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatEnvelope {
    pub response: AgentReply,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentOnly {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultsEnvelope {
    pub response: ContentOnly,
}

// ============================================================================
// Fuzzy correction
// ============================================================================

/// Confidence label attached to a proposed correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl From<String> for Confidence {
    fn from(label: String) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "low" => Confidence::Low,
            "high" => Confidence::High,
            _ => Confidence::Medium,
        }
    }
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// Proposed rewrite of a user query
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Correction {
    pub original: String,
    pub corrected: String,
    #[serde(default)]
    pub explanation: String,
    pub confidence: Confidence,
}

// ============================================================================
// Status and auth
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerStatus {
    pub status: String,
    #[serde(default)]
    pub data_count: u64,
}

impl ServerStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

impl AuthStatus {
    pub fn username(&self) -> Option<&str> {
        if self.authenticated {
            self.user.as_ref().map(|u| u.username.as_str())
        } else {
            None
        }
    }
}

// ============================================================================
// Saved conversations
// ============================================================================

/// Server-owned summary of a saved conversation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationRecord {
    pub id: i64,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub message_count: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationListEnvelope {
    #[serde(default)]
    pub conversations: Vec<ConversationRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationEnvelope {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SavedConversation {
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

// ============================================================================
// Message wire form
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum WireRole {
    User,
    Assistant,
}

/// Message as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: WireRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    pub timestamp: String,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        let (options, results) = match &msg.body {
            MessageBody::Question { options } => (Some(options.clone()), None),
            MessageBody::Results { results } => (None, Some(results.clone())),
            MessageBody::Plain | MessageBody::Reset => (None, None),
        };
        Self {
            role: match msg.role {
                Role::User => WireRole::User,
                Role::Assistant => WireRole::Assistant,
            },
            content: msg.content.clone(),
            message_type: Some(msg.body.type_tag().to_string()),
            options,
            results,
            timestamp: msg.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl TryFrom<WireMessage> for Message {
    type Error = ProtocolError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let timestamp = parse_timestamp(&wire.timestamp).ok_or_else(|| {
            ProtocolError::transport(format!("unparseable message timestamp: {}", wire.timestamp))
        })?;
        let body = match wire.message_type.as_deref() {
            Some("question") => MessageBody::Question {
                options: wire.options.unwrap_or_default(),
            },
            Some("results") => MessageBody::Results {
                results: wire.results.unwrap_or(Value::Null),
            },
            Some("reset") => MessageBody::Reset,
            _ => MessageBody::Plain,
        };
        Ok(Message {
            role: match wire.role {
                WireRole::User => Role::User,
                WireRole::Assistant => Role::Assistant,
            },
            content: wire.content,
            timestamp,
            body,
        })
    }
}

/// Backend timestamps are RFC 3339 from this client and naive UTC from the
/// database.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
