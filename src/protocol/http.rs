//! reqwest-backed implementation of the backend API

use super::types::{
    AgentReply, AuthStatus, ChatEnvelope, ChatRequest, ConversationEnvelope,
    ConversationListEnvelope, ConversationRecord, Correction, EmptyRequest, FuzzyRequest,
    ResultsEnvelope, SaveRequest, SavedConversation, ServerStatus, WireMessage,
};
use super::{ProtocolClient, ProtocolError};
use crate::config::ClientConfig;
use crate::transcript::Message;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Whether a response carries the `{success, message}` envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Envelope {
    Required,
    Absent,
}

/// HTTP client for the assistant backend
///
/// Keeps a cookie store: the backend keys its dialogue session on a cookie.
#[derive(Clone)]
pub struct HttpProtocolClient {
    client: Client,
    config: ClientConfig,
}

impl HttpProtocolClient {
    pub fn new(config: ClientConfig) -> Result<Self, ProtocolError> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ProtocolError::transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn exchange<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        envelope: Envelope,
    ) -> Result<T, ProtocolError> {
        let response = request.send().await.map_err(send_failure)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProtocolError::transport(format!("Failed to read response: {e}")))?;

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                ProtocolError::transport(format!("Malformed response body: {e}"))
            } else {
                ProtocolError::transport(format!("HTTP {status}"))
            }
        })?;

        // The backend reports application errors with 4xx/5xx statuses and
        // sometimes as a bare `{"error": ...}` object, so any JSON object
        // without `success: true` is the server rejecting the request.
        if envelope == Envelope::Required {
            match value.as_object() {
                Some(body) if body.get("success").and_then(Value::as_bool) == Some(true) => {}
                Some(_) => return Err(ProtocolError::application(failure_message(&value))),
                None if status.is_success() => {
                    return Err(ProtocolError::transport("Response is not an envelope object"));
                }
                None => {}
            }
        }

        if !status.is_success() {
            return Err(ProtocolError::transport(format!("HTTP {status}")));
        }

        serde_json::from_value(value)
            .map_err(|e| ProtocolError::transport(format!("Unexpected response shape: {e}")))
    }
}

fn send_failure(e: reqwest::Error) -> ProtocolError {
    if e.is_connect() {
        ProtocolError::transport(format!("Connection failed: {e}"))
    } else {
        ProtocolError::transport(format!("Request failed: {e}"))
    }
}

/// `message` is the documented field; some endpoints use `error` instead
fn failure_message(value: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ProtocolClient for HttpProtocolClient {
    async fn open_session(&self) -> Result<(), ProtocolError> {
        let response = self
            .client
            .get(self.config.endpoint("/"))
            .send()
            .await
            .map_err(send_failure)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProtocolError::transport(format!("HTTP {status}")));
        }
        Ok(())
    }

    async fn send_chat(&self, message: &str) -> Result<AgentReply, ProtocolError> {
        let request = self
            .client
            .post(self.config.endpoint("/api/chat"))
            .json(&ChatRequest { message });
        let envelope: ChatEnvelope = self.exchange(request, Envelope::Required).await?;
        Ok(envelope.response)
    }

    async fn show_current_results(&self) -> Result<String, ProtocolError> {
        let request = self
            .client
            .post(self.config.endpoint("/api/show_current_results"))
            .json(&EmptyRequest {});
        let envelope: ResultsEnvelope = self.exchange(request, Envelope::Required).await?;
        Ok(envelope.response.content)
    }

    async fn fuzzy_correct(&self, query: &str) -> Result<Correction, ProtocolError> {
        let request = self
            .client
            .post(self.config.endpoint("/api/fuzzy_correct"))
            .json(&FuzzyRequest { query });
        self.exchange(request, Envelope::Required).await
    }

    async fn server_status(&self) -> Result<ServerStatus, ProtocolError> {
        let request = self.client.get(self.config.endpoint("/api/status"));
        self.exchange(request, Envelope::Absent).await
    }

    async fn auth_status(&self) -> Result<AuthStatus, ProtocolError> {
        let request = self.client.get(self.config.endpoint("/check_auth"));
        self.exchange(request, Envelope::Absent).await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationRecord>, ProtocolError> {
        let request = self.client.get(self.config.endpoint("/api/conversations"));
        let envelope: ConversationListEnvelope =
            self.exchange(request, Envelope::Required).await?;
        Ok(envelope.conversations)
    }

    async fn fetch_conversation(&self, id: i64) -> Result<Vec<Message>, ProtocolError> {
        let request = self
            .client
            .get(self.config.endpoint(&format!("/api/conversations/{id}")));
        let envelope: ConversationEnvelope = self.exchange(request, Envelope::Required).await?;
        envelope
            .messages
            .into_iter()
            .map(Message::try_from)
            .collect()
    }

    async fn save_conversation(
        &self,
        title: &str,
        messages: &[Message],
    ) -> Result<SavedConversation, ProtocolError> {
        let body = SaveRequest {
            title,
            messages: messages.iter().map(WireMessage::from).collect(),
        };
        let request = self
            .client
            .post(self.config.endpoint("/api/save_conversation"))
            .json(&body);
        self.exchange(request, Envelope::Required).await
    }

    async fn delete_conversation(&self, id: i64) -> Result<(), ProtocolError> {
        let request = self
            .client
            .delete(self.config.endpoint(&format!("/api/conversations/{id}")));
        let _: Value = self.exchange(request, Envelope::Required).await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), ProtocolError> {
        let request = self.client.get(self.config.endpoint("/logout"));
        let _: Value = self.exchange(request, Envelope::Required).await?;
        Ok(())
    }
}
