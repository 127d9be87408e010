//! Session state types

use crate::protocol::{ConversationRecord, Correction, ServerStatus};
use crate::renderer::ModalKind;
use crate::transcript::TranscriptStore;

/// Which main-flow request is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainRequest {
    ChatTurn,
    CurrentResults,
}

/// Main chat flow
///
/// At most one main-flow request is outstanding at any time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ChatFlow {
    #[default]
    Idle,
    AwaitingResponse { request: MainRequest },
    OptionsPresented { options: Vec<String> },
}

/// Identifies the modal session a request was issued from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub flow: ModalKind,
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FuzzyFlow {
    #[default]
    Closed,
    Requesting,
    Open { correction: Correction },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Loading,
    Failed,
    Records(Vec<ConversationRecord>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRequest {
    List,
    Fetch { id: i64 },
    Delete { id: i64 },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum HistoryFlow {
    #[default]
    Closed,
    Open {
        listing: Listing,
        pending: Option<HistoryRequest>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveFlow {
    #[default]
    Closed,
    Editing { title: String, error: Option<String> },
    Submitting { title: String },
}

/// Action waiting on a yes/no answer from the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Reset,
    DeleteConversation { id: i64 },
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unknown,
    Anonymous,
    SignedIn { username: String },
}

/// Per-flow counters; bumping one invalidates that flow's in-flight tickets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowEpochs {
    fuzzy: u64,
    history: u64,
    save: u64,
}

impl FlowEpochs {
    fn slot(&mut self, flow: ModalKind) -> &mut u64 {
        match flow {
            ModalKind::Fuzzy => &mut self.fuzzy,
            ModalKind::History => &mut self.history,
            ModalKind::Save => &mut self.save,
        }
    }

    pub fn current(&self, flow: ModalKind) -> u64 {
        match flow {
            ModalKind::Fuzzy => self.fuzzy,
            ModalKind::History => self.history,
            ModalKind::Save => self.save,
        }
    }

    pub fn bump(&mut self, flow: ModalKind) -> Ticket {
        let slot = self.slot(flow);
        *slot += 1;
        Ticket { flow, epoch: *slot }
    }
}

/// Complete session state
///
/// Owned by exactly one runtime; the transcript itself lives next to it in the
/// runtime and is passed to transitions read-only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub chat: ChatFlow,
    /// Current contents of the text input
    pub input: String,
    pub auth: AuthState,
    pub server: Option<ServerStatus>,
    pub fuzzy: FuzzyFlow,
    pub history: HistoryFlow,
    pub save: SaveFlow,
    pub confirmation: Option<Confirmation>,
    pub epochs: FlowEpochs,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_awaiting_response(&self) -> bool {
        matches!(self.chat, ChatFlow::AwaitingResponse { .. })
    }

    pub fn options_visible(&self) -> bool {
        matches!(self.chat, ChatFlow::OptionsPresented { .. })
    }

    pub fn presented_options(&self) -> &[String] {
        match &self.chat {
            ChatFlow::OptionsPresented { options } => options,
            _ => &[],
        }
    }

    pub fn modal_active(&self, kind: ModalKind) -> bool {
        match kind {
            ModalKind::Fuzzy => matches!(self.fuzzy, FuzzyFlow::Open { .. }),
            ModalKind::History => self.history != HistoryFlow::Closed,
            ModalKind::Save => self.save != SaveFlow::Closed,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match &self.auth {
            AuthState::SignedIn { username } => Some(username),
            AuthState::Unknown | AuthState::Anonymous => None,
        }
    }

    /// Ticket for a request issued from the flow's current session
    pub fn ticket(&self, flow: ModalKind) -> Ticket {
        Ticket {
            flow,
            epoch: self.epochs.current(flow),
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.epochs.current(ticket.flow) == ticket.epoch
    }
}

/// Read-only inputs to a transition besides the state itself
#[derive(Debug, Clone, Copy)]
pub struct SessionContext<'a> {
    pub transcript: &'a TranscriptStore,
}

impl<'a> SessionContext<'a> {
    pub fn new(transcript: &'a TranscriptStore) -> Self {
        Self { transcript }
    }
}
