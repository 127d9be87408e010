//! Events that can occur in a session

use super::state::Ticket;
use crate::protocol::{
    AgentReply, AuthStatus, ConversationRecord, Correction, ProtocolError, SavedConversation,
    ServerStatus,
};
use crate::transcript::Message;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    /// Page loaded: open the backend session, then check status and auth
    Startup,
    InputChanged { text: String },
    ClearInput,
    Submit,
    OptionSelected { index: usize },
    ResetClicked,
    BackClicked,
    ShowResultsClicked,
    /// Answer to the pending confirmation prompt
    Confirm { accepted: bool },
    LogoutClicked,

    // Fuzzy-match flow
    FuzzyClicked,
    FuzzyAccept,
    FuzzyDismiss,

    // History flow
    HistoryOpen,
    HistoryClose,
    HistoryView { id: i64 },
    HistoryDelete { id: i64 },

    // Save flow
    SaveOpen,
    SaveTitleChanged { title: String },
    SaveSubmit,
    SaveClose,

    // Request completions
    SessionOpened {
        result: Result<(), ProtocolError>,
    },
    ChatCompleted {
        result: Result<AgentReply, ProtocolError>,
    },
    CurrentResultsCompleted {
        result: Result<String, ProtocolError>,
    },
    FuzzyCompleted {
        ticket: Ticket,
        result: Result<Correction, ProtocolError>,
    },
    ConversationsListed {
        ticket: Ticket,
        result: Result<Vec<ConversationRecord>, ProtocolError>,
    },
    ConversationFetched {
        ticket: Ticket,
        result: Result<Vec<Message>, ProtocolError>,
    },
    ConversationDeleted {
        ticket: Ticket,
        result: Result<(), ProtocolError>,
    },
    ConversationSaved {
        ticket: Ticket,
        result: Result<SavedConversation, ProtocolError>,
    },
    StatusChecked {
        result: Result<ServerStatus, ProtocolError>,
    },
    AuthChecked {
        result: Result<AuthStatus, ProtocolError>,
    },
    LoggedOut {
        result: Result<(), ProtocolError>,
    },
}

impl Event {
    /// True for events posted back by a finished remote call
    pub fn is_completion(&self) -> bool {
        matches!(
            self,
            Event::SessionOpened { .. }
                | Event::ChatCompleted { .. }
                | Event::CurrentResultsCompleted { .. }
                | Event::FuzzyCompleted { .. }
                | Event::ConversationsListed { .. }
                | Event::ConversationFetched { .. }
                | Event::ConversationDeleted { .. }
                | Event::ConversationSaved { .. }
                | Event::StatusChecked { .. }
                | Event::AuthChecked { .. }
                | Event::LoggedOut { .. }
        )
    }
}
