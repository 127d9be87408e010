//! Protocol error types

use thiserror::Error;

/// Outcome of a failed remote call
///
/// The controller only distinguishes these two kinds; the detail string of a
/// transport failure is for logs, never for the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Network unreachable or an unusable response
    #[error("transport failure: {0}")]
    Transport(String),
    /// JSON object response without `success: true`
    #[error("application failure: {}", .message.as_deref().unwrap_or("(no message)"))]
    Application { message: Option<String> },
}

impl ProtocolError {
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport(detail.into())
    }

    pub fn application(message: Option<String>) -> Self {
        Self::Application { message }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) => FailureKind::Transport,
            Self::Application { .. } => FailureKind::Application,
        }
    }

    /// Server-supplied text, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Application { message } => message.as_deref(),
            Self::Transport(_) => None,
        }
    }
}

/// Failure classification seen by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Application,
}
