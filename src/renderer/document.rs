//! In-memory document the view updates are applied to

use super::{Bubble, FuzzyView, HistoryView, LoadingSlot, ModalKind, OptionButton, SaveView, ViewUpdate};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Bubble(Bubble),
    Loading(LoadingSlot),
}

/// Current state of the page
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub nodes: Vec<Node>,
    pub options: Vec<OptionButton>,
    pub input: String,
    pub fuzzy: Option<FuzzyView>,
    pub history: Option<HistoryView>,
    pub save: Option<SaveView>,
    pub prompt: Option<String>,
    pub alerts: Vec<String>,
    pub username: Option<String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, update: &ViewUpdate) {
        match update {
            ViewUpdate::AppendBubble(bubble) => self.nodes.push(Node::Bubble(bubble.clone())),
            // Pending requests keep their placeholders across a clear
            ViewUpdate::Clear => self.nodes.retain(|n| matches!(n, Node::Loading(_))),
            ViewUpdate::ShowOptions(buttons) => self.options.clone_from(buttons),
            ViewUpdate::HideOptions => self.options.clear(),
            ViewUpdate::ShowLoading(slot) => {
                if !self.is_loading(*slot) {
                    self.nodes.push(Node::Loading(*slot));
                }
            }
            ViewUpdate::RemoveLoading(slot) => {
                self.nodes.retain(|n| *n != Node::Loading(*slot));
            }
            ViewUpdate::SetInput(text) => self.input.clone_from(text),
            ViewUpdate::Alert(text) => self.alerts.push(text.clone()),
            ViewUpdate::Confirm(text) => self.prompt = Some(text.clone()),
            ViewUpdate::ClosePrompt => self.prompt = None,
            ViewUpdate::ShowFuzzy(view) => self.fuzzy = Some(view.clone()),
            ViewUpdate::ShowHistory(view) => self.history = Some(view.clone()),
            ViewUpdate::ShowSave(view) => self.save = Some(view.clone()),
            ViewUpdate::CloseModal(kind) => match kind {
                ModalKind::Fuzzy => self.fuzzy = None,
                ModalKind::History => self.history = None,
                ModalKind::Save => self.save = None,
            },
            ViewUpdate::SetAuth(username) => self.username.clone_from(username),
        }
    }

    pub fn is_loading(&self, slot: LoadingSlot) -> bool {
        self.nodes.contains(&Node::Loading(slot))
    }

    pub fn bubbles(&self) -> impl Iterator<Item = &Bubble> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Bubble(b) => Some(b),
            Node::Loading(_) => None,
        })
    }

    /// Save and history controls are only shown to signed-in users
    pub fn account_controls_visible(&self) -> bool {
        self.username.is_some()
    }

    /// Serialize the chat area and option grid
    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"chat-history\">");
        for node in &self.nodes {
            match node {
                Node::Bubble(bubble) => {
                    let class = bubble.role.as_str();
                    let body = bubble
                        .lines
                        .iter()
                        .map(|l| escape(l))
                        .collect::<Vec<_>>()
                        .join("<br>");
                    let _ = write!(
                        html,
                        "<div class=\"message {class}\"><div class=\"message-content\">\
                         <div class=\"message-type\">{}</div><div>{body}</div></div></div>",
                        bubble.label
                    );
                }
                Node::Loading(_) => html.push_str(
                    "<div class=\"message assistant loading\"><div class=\"message-content\">\
                     <div>Searching</div><div class=\"loading-dots\"><span></span><span></span><span></span></div>\
                     </div></div>",
                ),
            }
        }
        html.push_str("</div>");

        if !self.options.is_empty() {
            html.push_str("<div class=\"options-grid\">");
            for button in &self.options {
                let _ = write!(
                    html,
                    "<button class=\"option-button\"><strong>{}</strong> {}</button>",
                    button.label,
                    escape(&button.text)
                );
            }
            html.push_str("</div>");
        }
        html
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
