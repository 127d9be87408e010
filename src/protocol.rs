//! Backend protocol client
//!
//! Every remote operation the session performs, as one `async fn` each.

mod error;
mod http;
mod types;

pub use error::{FailureKind, ProtocolError};
pub use http::HttpProtocolClient;
pub use types::{
    AgentReply, AuthStatus, AuthUser, Confidence, ConversationRecord, Correction, ReplyKind,
    SavedConversation, ServerStatus,
};

use crate::transcript::Message;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Common interface for the backend API
///
/// `send_chat` advances server-side dialogue state and must never be retried
/// by an implementation.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// GET /
    ///
    /// Opens the backend session. The server issues the session cookie here;
    /// the response body is a page and is ignored.
    async fn open_session(&self) -> Result<(), ProtocolError>;

    /// POST /api/chat
    async fn send_chat(&self, message: &str) -> Result<AgentReply, ProtocolError>;

    /// POST /api/show_current_results
    async fn show_current_results(&self) -> Result<String, ProtocolError>;

    /// POST /api/fuzzy_correct
    async fn fuzzy_correct(&self, query: &str) -> Result<Correction, ProtocolError>;

    /// GET /api/status
    async fn server_status(&self) -> Result<ServerStatus, ProtocolError>;

    /// GET /check_auth
    async fn auth_status(&self) -> Result<AuthStatus, ProtocolError>;

    /// GET /api/conversations
    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>, ProtocolError>;

    /// GET /api/conversations/{id}
    async fn fetch_conversation(&self, id: i64) -> Result<Vec<Message>, ProtocolError>;

    /// POST /api/save_conversation
    async fn save_conversation(
        &self,
        title: &str,
        messages: &[Message],
    ) -> Result<SavedConversation, ProtocolError>;

    /// DELETE /api/conversations/{id}
    async fn delete_conversation(&self, id: i64) -> Result<(), ProtocolError>;

    /// GET /logout
    async fn logout(&self) -> Result<(), ProtocolError>;
}

#[async_trait]
impl<T: ProtocolClient + ?Sized> ProtocolClient for Arc<T> {
    async fn open_session(&self) -> Result<(), ProtocolError> {
        (**self).open_session().await
    }

    async fn send_chat(&self, message: &str) -> Result<AgentReply, ProtocolError> {
        (**self).send_chat(message).await
    }

    async fn show_current_results(&self) -> Result<String, ProtocolError> {
        (**self).show_current_results().await
    }

    async fn fuzzy_correct(&self, query: &str) -> Result<Correction, ProtocolError> {
        (**self).fuzzy_correct(query).await
    }

    async fn server_status(&self) -> Result<ServerStatus, ProtocolError> {
        (**self).server_status().await
    }

    async fn auth_status(&self) -> Result<AuthStatus, ProtocolError> {
        (**self).auth_status().await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>, ProtocolError> {
        (**self).list_conversations().await
    }

    async fn fetch_conversation(&self, id: i64) -> Result<Vec<Message>, ProtocolError> {
        (**self).fetch_conversation(id).await
    }

    async fn save_conversation(
        &self,
        title: &str,
        messages: &[Message],
    ) -> Result<SavedConversation, ProtocolError> {
        (**self).save_conversation(title, messages).await
    }

    async fn delete_conversation(&self, id: i64) -> Result<(), ProtocolError> {
        (**self).delete_conversation(id).await
    }

    async fn logout(&self) -> Result<(), ProtocolError> {
        (**self).logout().await
    }
}

/// Logging wrapper for protocol clients
pub struct LoggingClient<C> {
    inner: C,
}

impl<C: ProtocolClient> LoggingClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    fn record<T>(operation: &'static str, start: Instant, result: &Result<T, ProtocolError>) {
        let duration = start.elapsed();
        match result {
            Ok(_) => {
                tracing::info!(
                    operation,
                    duration_ms = %duration.as_millis(),
                    "Backend request completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    operation,
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind(),
                    error = %e,
                    "Backend request failed"
                );
            }
        }
    }
}

#[async_trait]
impl<C: ProtocolClient> ProtocolClient for LoggingClient<C> {
    async fn open_session(&self) -> Result<(), ProtocolError> {
        let start = Instant::now();
        let result = self.inner.open_session().await;
        Self::record("open_session", start, &result);
        result
    }

    async fn send_chat(&self, message: &str) -> Result<AgentReply, ProtocolError> {
        let start = Instant::now();
        let result = self.inner.send_chat(message).await;
        Self::record("send_chat", start, &result);
        result
    }

    async fn show_current_results(&self) -> Result<String, ProtocolError> {
        let start = Instant::now();
        let result = self.inner.show_current_results().await;
        Self::record("show_current_results", start, &result);
        result
    }

    async fn fuzzy_correct(&self, query: &str) -> Result<Correction, ProtocolError> {
        let start = Instant::now();
        let result = self.inner.fuzzy_correct(query).await;
        Self::record("fuzzy_correct", start, &result);
        result
    }

    async fn server_status(&self) -> Result<ServerStatus, ProtocolError> {
        let start = Instant::now();
        let result = self.inner.server_status().await;
        Self::record("server_status", start, &result);
        result
    }

    async fn auth_status(&self) -> Result<AuthStatus, ProtocolError> {
        let start = Instant::now();
        let result = self.inner.auth_status().await;
        Self::record("auth_status", start, &result);
        result
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>, ProtocolError> {
        let start = Instant::now();
        let result = self.inner.list_conversations().await;
        Self::record("list_conversations", start, &result);
        result
    }

    async fn fetch_conversation(&self, id: i64) -> Result<Vec<Message>, ProtocolError> {
        let start = Instant::now();
        let result = self.inner.fetch_conversation(id).await;
        Self::record("fetch_conversation", start, &result);
        result
    }

    async fn save_conversation(
        &self,
        title: &str,
        messages: &[Message],
    ) -> Result<SavedConversation, ProtocolError> {
        let start = Instant::now();
        let result = self.inner.save_conversation(title, messages).await;
        Self::record("save_conversation", start, &result);
        result
    }

    async fn delete_conversation(&self, id: i64) -> Result<(), ProtocolError> {
        let start = Instant::now();
        let result = self.inner.delete_conversation(id).await;
        Self::record("delete_conversation", start, &result);
        result
    }

    async fn logout(&self) -> Result<(), ProtocolError> {
        let start = Instant::now();
        let result = self.inner.logout().await;
        Self::record("logout", start, &result);
        result
    }
}
