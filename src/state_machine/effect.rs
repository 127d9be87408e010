//! Effects produced by state transitions

use super::state::Ticket;
use crate::renderer::ViewUpdate;
use crate::transcript::{Message, MessageDraft};

/// Remote call to issue; the runtime posts the matching completion event
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// Fetch the entry page so the backend issues its session cookie
    OpenSession,
    SendChat { message: String },
    ShowCurrentResults,
    FuzzyCorrect { ticket: Ticket, query: String },
    ServerStatus,
    AuthStatus,
    ListConversations { ticket: Ticket },
    FetchConversation { ticket: Ticket, id: i64 },
    SaveConversation {
        ticket: Ticket,
        title: String,
        messages: Vec<Message>,
    },
    DeleteConversation { ticket: Ticket, id: i64 },
    Logout,
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::OpenSession => "open_session",
            Call::SendChat { .. } => "send_chat",
            Call::ShowCurrentResults => "show_current_results",
            Call::FuzzyCorrect { .. } => "fuzzy_correct",
            Call::ServerStatus => "server_status",
            Call::AuthStatus => "auth_status",
            Call::ListConversations { .. } => "list_conversations",
            Call::FetchConversation { .. } => "fetch_conversation",
            Call::SaveConversation { .. } => "save_conversation",
            Call::DeleteConversation { .. } => "delete_conversation",
            Call::Logout => "logout",
        }
    }

    /// Main-flow calls are the ones limited to one in flight
    pub fn is_main_flow(&self) -> bool {
        matches!(self, Call::SendChat { .. } | Call::ShowCurrentResults)
    }
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Stamp and append to the transcript, then render it
    AppendMessage(MessageDraft),

    /// Empty the transcript and the chat area
    ClearTranscript,

    /// Swap in a loaded conversation and re-render the chat area
    ReplaceTranscript(Vec<Message>),

    /// Apply a view update
    Render(ViewUpdate),

    /// Issue a remote call
    Request(Call),
}

impl Effect {
    pub fn render(update: ViewUpdate) -> Self {
        Effect::Render(update)
    }

    pub fn assistant_message(content: impl Into<String>) -> Self {
        Effect::AppendMessage(MessageDraft::assistant(content))
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Effect::Render(ViewUpdate::Alert(text.into()))
    }
}
