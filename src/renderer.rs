//! View projection
//!
//! Pure functions from messages and UI-mode changes to `ViewUpdate`s. No
//! decisions are made here; the state machine decides what to show and the
//! `Document` applies it.

mod document;

pub use document::Document;

use crate::protocol::{Confidence, ConversationRecord, Correction};
use crate::transcript::{Message, Role};

/// Which of the parallel loading placeholders an update targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadingSlot {
    Chat,
    Fuzzy,
}

/// Modal dialogs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalKind {
    Fuzzy,
    History,
    Save,
}

/// One rendered transcript entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub role: Role,
    pub label: &'static str,
    /// Content split on embedded newlines
    pub lines: Vec<String>,
}

/// One entry of the option grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionButton {
    /// Sequential letter label, "A." for the first option
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyView {
    pub original: String,
    pub corrected: String,
    pub explanation: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryView {
    Loading,
    Empty,
    Failed,
    Records(Vec<ConversationRecord>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveView {
    pub title: String,
    pub error: Option<String>,
}

/// A single view mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    AppendBubble(Bubble),
    Clear,
    ShowOptions(Vec<OptionButton>),
    HideOptions,
    ShowLoading(LoadingSlot),
    RemoveLoading(LoadingSlot),
    SetInput(String),
    Alert(String),
    Confirm(String),
    ClosePrompt,
    ShowFuzzy(FuzzyView),
    ShowHistory(HistoryView),
    ShowSave(SaveView),
    CloseModal(ModalKind),
    /// Signed-in username, or `None` for the anonymous controls
    SetAuth(Option<String>),
}

pub fn bubble(message: &Message) -> Bubble {
    Bubble {
        role: message.role,
        label: match message.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        },
        lines: message.content.split('\n').map(str::to_string).collect(),
    }
}

pub fn message_appended(message: &Message) -> ViewUpdate {
    ViewUpdate::AppendBubble(bubble(message))
}

/// Grid label for the option at `index`: A, B, ... Z, AA, AB, ...
pub fn option_label(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + u8::try_from(rem).unwrap_or(0)));
        n = (n - 1) / 26;
    }
    letters.iter().rev().chain(std::iter::once(&'.')).collect()
}

pub fn option_grid(options: &[String]) -> ViewUpdate {
    ViewUpdate::ShowOptions(
        options
            .iter()
            .enumerate()
            .map(|(i, text)| OptionButton {
                label: option_label(i),
                text: text.clone(),
            })
            .collect(),
    )
}

pub fn fuzzy_modal(correction: &Correction) -> ViewUpdate {
    ViewUpdate::ShowFuzzy(FuzzyView {
        original: correction.original.clone(),
        corrected: correction.corrected.clone(),
        explanation: correction.explanation.clone(),
        confidence: correction.confidence,
    })
}

pub fn history_modal(records: &[ConversationRecord]) -> ViewUpdate {
    if records.is_empty() {
        ViewUpdate::ShowHistory(HistoryView::Empty)
    } else {
        ViewUpdate::ShowHistory(HistoryView::Records(records.to_vec()))
    }
}

pub fn save_modal(title: &str, error: Option<&str>) -> ViewUpdate {
    ViewUpdate::ShowSave(SaveView {
        title: title.to_string(),
        error: error.map(str::to_string),
    })
}
