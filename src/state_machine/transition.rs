//! Pure state transition function
//!
//! Given the same state, transcript and event this always produces the same
//! new state and effects; it never performs I/O or reads the clock.

use super::effect::Call;
use super::state::{
    AuthState, ChatFlow, Confirmation, FuzzyFlow, HistoryFlow, HistoryRequest, Listing,
    MainRequest, SaveFlow, SessionContext, SessionState, Ticket,
};
use super::{Effect, Event};
use crate::protocol::{AgentReply, FailureKind, ProtocolError, ReplyKind};
use crate::renderer::{self, HistoryView, LoadingSlot, ModalKind, ViewUpdate};
use crate::transcript::{MessageBody, MessageDraft, TranscriptStore};
use thiserror::Error;

pub const RESET_COMMAND: &str = "/reset";
pub const BACK_COMMAND: &str = "/back";

pub const WELCOME_TEXT: &str = "Welcome to the circuit diagram navigation assistant!\n\
You can ask things like:\n\
- \"I need the instrument diagram for a Dongfeng Tianlong\"\n\
- \"Find the circuit diagram for a Sany excavator\"\n\
- \"Pin definitions for the XCMG XE135G\"\n\
- \"Hongyan Genlyon fuse diagram\"\n\
I will narrow things down with you until we find the exact diagram.";
pub const NETWORK_ERROR_TEXT: &str =
    "There is a problem with the network connection. Please check your connection.";
pub const PROCESSING_ERROR_TEXT: &str =
    "Sorry, something went wrong while processing your request. Please try again later.";
pub const NO_RESULTS_TEXT: &str =
    "Sorry, there are no current results to show. Please run a search first.";
pub const SERVER_UNREACHABLE_TEXT: &str =
    "Cannot connect to the server. Please make sure the backend service is running.";

const RESET_PROMPT: &str = "Reset the conversation? This clears the whole history.";
const LOGOUT_PROMPT: &str = "Log out now?";
const DELETE_PROMPT: &str = "Delete this conversation?";
const FUZZY_NEEDS_INPUT: &str = "Enter a query before using fuzzy matching.";
const FUZZY_FAILED: &str = "Fuzzy correction failed, please try again.";
const NETWORK_ALERT: &str = "Network error, please try again.";
const NOTHING_TO_SAVE: &str = "There is no conversation to save yet.";
const SAVED: &str = "Conversation saved.";
const SAVE_FAILED: &str = "Saving failed.";
const LOADED: &str = "The saved conversation has been loaded into this window.";
const DELETED: &str = "Conversation deleted.";
const LOGOUT_FAILED: &str = "Logging out failed, please try again.";
const UNKNOWN_ERROR: &str = "unknown error";

pub const DEFAULT_TITLE: &str = "New conversation";
pub const TITLE_PREFILL_CHARS: usize = 50;
pub const MAX_TITLE_CHARS: usize = 200;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A response is still pending, wait for it before sending again")]
    AwaitingResponse,
    #[error("Message is empty")]
    EmptyInput,
    #[error("Sign in to use saved conversations")]
    NotSignedIn,
    #[error("No confirmation is pending")]
    NoPendingConfirmation,
    #[error("{0:?} flow already has a request in flight")]
    FlowBusy(ModalKind),
    #[error("Discarded response from a superseded {0:?} session")]
    StaleResponse(ModalKind),
    #[error("Unexpected {0} completion")]
    UnexpectedCompletion(&'static str),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl TransitionError {
    /// Rejections the user caused and should be told about
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::AwaitingResponse | Self::EmptyInput | Self::NotSignedIn | Self::FlowBusy(_)
        )
    }
}

/// Local validation failures of the save dialog
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TitleError {
    #[error("Please enter a conversation title")]
    Empty,
    #[error("The title cannot be longer than 200 characters")]
    TooLong,
}

/// Trimmed title, or why it cannot be submitted
pub fn validate_title(raw: &str) -> Result<String, TitleError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(TitleError::Empty);
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(TitleError::TooLong);
    }
    Ok(title.to_string())
}

/// Save-dialog prefill: the first user message, shortened
pub fn default_title(transcript: &TranscriptStore) -> String {
    let Some(first) = transcript.first_user_message() else {
        return DEFAULT_TITLE.to_string();
    };
    let mut title: String = first.content.chars().take(TITLE_PREFILL_CHARS).collect();
    if first.content.chars().count() > TITLE_PREFILL_CHARS {
        title.push_str("...");
    }
    title
}

/// Pure transition function
#[allow(clippy::too_many_lines)]
pub fn transition(
    state: &SessionState,
    context: &SessionContext<'_>,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let mut next = state.clone();

    match event {
        // ============================================================
        // Startup and input
        // ============================================================
        Event::Startup => {
            Ok(TransitionResult::new(next).with_effect(Effect::Request(Call::OpenSession)))
        }

        // The checks wait for the session cookie; a failed open still runs
        // them so the status check can report the unreachable backend.
        Event::SessionOpened { .. } => Ok(TransitionResult::new(next)
            .with_effect(Effect::Request(Call::ServerStatus))
            .with_effect(Effect::Request(Call::AuthStatus))),

        Event::InputChanged { text } => {
            next.input = text;
            Ok(TransitionResult::new(next))
        }

        Event::ClearInput => {
            next.input.clear();
            Ok(TransitionResult::new(next).with_effect(Effect::render(ViewUpdate::SetInput(
                String::new(),
            ))))
        }

        // ============================================================
        // Chat turns
        // ============================================================
        Event::Submit => {
            let text = next.input.clone();
            let effects = submit_text(&mut next, &text)?;
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        Event::OptionSelected { index } => {
            let options = state.presented_options();
            if options.is_empty() {
                return Err(TransitionError::InvalidTransition(
                    "no options are presented".to_string(),
                ));
            }
            let option = options.get(index).cloned().ok_or_else(|| {
                TransitionError::InvalidTransition(format!("option {index} does not exist"))
            })?;
            let effects = submit_text(&mut next, &option)?;
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        Event::BackClicked => {
            let effects = submit_text(&mut next, BACK_COMMAND)?;
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        Event::ResetClicked => {
            next.confirmation = Some(Confirmation::Reset);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render(ViewUpdate::Confirm(RESET_PROMPT.to_string()))))
        }

        Event::ShowResultsClicked => {
            if state.is_awaiting_response() {
                return Err(TransitionError::AwaitingResponse);
            }
            let mut effects = Vec::new();
            if state.options_visible() {
                effects.push(Effect::render(ViewUpdate::HideOptions));
            }
            effects.push(Effect::render(ViewUpdate::ShowLoading(LoadingSlot::Chat)));
            effects.push(Effect::Request(Call::ShowCurrentResults));
            next.chat = ChatFlow::AwaitingResponse {
                request: MainRequest::CurrentResults,
            };
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        Event::ChatCompleted { result } => {
            if state.chat
                != (ChatFlow::AwaitingResponse {
                    request: MainRequest::ChatTurn,
                })
            {
                return Err(TransitionError::UnexpectedCompletion("chat"));
            }
            let mut effects = vec![Effect::render(ViewUpdate::RemoveLoading(LoadingSlot::Chat))];
            match result {
                Ok(reply) => {
                    next.chat = classify_reply(reply, &mut effects);
                }
                Err(e) => {
                    let text = match e.kind() {
                        FailureKind::Transport => NETWORK_ERROR_TEXT,
                        FailureKind::Application => PROCESSING_ERROR_TEXT,
                    };
                    effects.push(Effect::assistant_message(text));
                    next.chat = ChatFlow::Idle;
                }
            }
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        Event::CurrentResultsCompleted { result } => {
            if state.chat
                != (ChatFlow::AwaitingResponse {
                    request: MainRequest::CurrentResults,
                })
            {
                return Err(TransitionError::UnexpectedCompletion("current results"));
            }
            let message = match result {
                Ok(content) => Effect::assistant_message(content),
                Err(e) if e.kind() == FailureKind::Transport => {
                    Effect::assistant_message(NETWORK_ERROR_TEXT)
                }
                Err(_) => Effect::assistant_message(NO_RESULTS_TEXT),
            };
            next.chat = ChatFlow::Idle;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render(ViewUpdate::RemoveLoading(LoadingSlot::Chat)))
                .with_effect(message))
        }

        // ============================================================
        // Confirmation prompts
        // ============================================================
        Event::Confirm { accepted } => {
            let confirmation = next
                .confirmation
                .take()
                .ok_or(TransitionError::NoPendingConfirmation)?;
            let mut effects = vec![Effect::render(ViewUpdate::ClosePrompt)];
            if accepted {
                let outcome = match confirmation {
                    Confirmation::Reset => submit_text(&mut next, RESET_COMMAND),
                    Confirmation::Logout => Ok(vec![Effect::Request(Call::Logout)]),
                    Confirmation::DeleteConversation { id } => start_delete(&mut next, id),
                };
                // The prompt is answered either way; a blocked action is
                // reported instead of leaving the prompt pending.
                match outcome {
                    Ok(more) => effects.extend(more),
                    Err(e) => effects.push(Effect::alert(e.to_string())),
                }
            }
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        // ============================================================
        // Status, auth and logout
        // ============================================================
        Event::StatusChecked { result } => match result {
            Ok(status) => {
                next.server = Some(status);
                Ok(TransitionResult::new(next))
            }
            Err(_) => Ok(TransitionResult::new(next)
                .with_effect(Effect::assistant_message(SERVER_UNREACHABLE_TEXT))),
        },

        Event::AuthChecked { result } => {
            let username = result
                .ok()
                .and_then(|auth| auth.username().map(str::to_string));
            next.auth = match &username {
                Some(name) => AuthState::SignedIn {
                    username: name.clone(),
                },
                None => AuthState::Anonymous,
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render(ViewUpdate::SetAuth(username))))
        }

        Event::LogoutClicked => {
            if state.username().is_none() {
                return Err(TransitionError::NotSignedIn);
            }
            next.confirmation = Some(Confirmation::Logout);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render(ViewUpdate::Confirm(LOGOUT_PROMPT.to_string()))))
        }

        Event::LoggedOut { result } => {
            if result.is_err() {
                return Ok(TransitionResult::new(next).with_effect(Effect::alert(LOGOUT_FAILED)));
            }
            // Equivalent of a page reload: a fresh, signed-out session
            let mut fresh = SessionState {
                auth: AuthState::Anonymous,
                server: state.server.clone(),
                epochs: state.epochs,
                ..SessionState::new()
            };
            if state.is_awaiting_response() {
                fresh.chat = state.chat.clone();
            }
            for kind in [ModalKind::Fuzzy, ModalKind::History, ModalKind::Save] {
                fresh.epochs.bump(kind);
            }
            Ok(TransitionResult::new(fresh).with_effects([
                Effect::Request(Call::OpenSession),
                Effect::ClearTranscript,
                Effect::render(ViewUpdate::HideOptions),
                Effect::render(ViewUpdate::RemoveLoading(LoadingSlot::Fuzzy)),
                Effect::render(ViewUpdate::CloseModal(ModalKind::Fuzzy)),
                Effect::render(ViewUpdate::CloseModal(ModalKind::History)),
                Effect::render(ViewUpdate::CloseModal(ModalKind::Save)),
                Effect::render(ViewUpdate::SetInput(String::new())),
                Effect::render(ViewUpdate::SetAuth(None)),
            ]))
        }

        // ============================================================
        // Fuzzy-match flow
        // ============================================================
        Event::FuzzyClicked => {
            let query = state.input.trim().to_string();
            if query.is_empty() {
                return Ok(TransitionResult::new(next).with_effect(Effect::alert(FUZZY_NEEDS_INPUT)));
            }
            let mut effects = Vec::new();
            if state.modal_active(ModalKind::Fuzzy) {
                effects.push(Effect::render(ViewUpdate::CloseModal(ModalKind::Fuzzy)));
            }
            let ticket = next.epochs.bump(ModalKind::Fuzzy);
            next.fuzzy = FuzzyFlow::Requesting;
            effects.push(Effect::render(ViewUpdate::ShowLoading(LoadingSlot::Fuzzy)));
            effects.push(Effect::Request(Call::FuzzyCorrect { ticket, query }));
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        Event::FuzzyCompleted { ticket, result } => {
            ensure_current(state, ticket)?;
            if state.fuzzy != FuzzyFlow::Requesting {
                return Err(TransitionError::UnexpectedCompletion("fuzzy"));
            }
            let mut effects = vec![Effect::render(ViewUpdate::RemoveLoading(LoadingSlot::Fuzzy))];
            match result {
                Ok(correction) => {
                    effects.push(Effect::render(renderer::fuzzy_modal(&correction)));
                    next.fuzzy = FuzzyFlow::Open { correction };
                }
                Err(e) => {
                    effects.push(Effect::alert(match e.kind() {
                        FailureKind::Transport => NETWORK_ALERT,
                        FailureKind::Application => FUZZY_FAILED,
                    }));
                    next.fuzzy = FuzzyFlow::Closed;
                }
            }
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        Event::FuzzyAccept => {
            let FuzzyFlow::Open { correction } = &state.fuzzy else {
                return Err(TransitionError::InvalidTransition(
                    "no correction to accept".to_string(),
                ));
            };
            next.input.clone_from(&correction.corrected);
            next.fuzzy = FuzzyFlow::Closed;
            next.epochs.bump(ModalKind::Fuzzy);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render(ViewUpdate::SetInput(correction.corrected.clone())))
                .with_effect(Effect::render(ViewUpdate::CloseModal(ModalKind::Fuzzy))))
        }

        Event::FuzzyDismiss => {
            let update = match state.fuzzy {
                FuzzyFlow::Closed => {
                    return Err(TransitionError::InvalidTransition(
                        "fuzzy modal is not open".to_string(),
                    ))
                }
                FuzzyFlow::Requesting => ViewUpdate::RemoveLoading(LoadingSlot::Fuzzy),
                FuzzyFlow::Open { .. } => ViewUpdate::CloseModal(ModalKind::Fuzzy),
            };
            next.fuzzy = FuzzyFlow::Closed;
            next.epochs.bump(ModalKind::Fuzzy);
            Ok(TransitionResult::new(next).with_effect(Effect::render(update)))
        }

        // ============================================================
        // History flow
        // ============================================================
        Event::HistoryOpen => {
            if state.username().is_none() {
                return Err(TransitionError::NotSignedIn);
            }
            let ticket = next.epochs.bump(ModalKind::History);
            next.history = HistoryFlow::Open {
                listing: Listing::Loading,
                pending: Some(HistoryRequest::List),
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render(ViewUpdate::ShowHistory(HistoryView::Loading)))
                .with_effect(Effect::Request(Call::ListConversations { ticket })))
        }

        Event::HistoryClose => {
            if state.history == HistoryFlow::Closed {
                return Err(TransitionError::InvalidTransition(
                    "history modal is not open".to_string(),
                ));
            }
            next.history = HistoryFlow::Closed;
            next.epochs.bump(ModalKind::History);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render(ViewUpdate::CloseModal(ModalKind::History))))
        }

        Event::HistoryView { id } => {
            let HistoryFlow::Open { listing, pending } = &state.history else {
                return Err(TransitionError::InvalidTransition(
                    "history modal is not open".to_string(),
                ));
            };
            if pending.is_some() {
                return Err(TransitionError::FlowBusy(ModalKind::History));
            }
            next.history = HistoryFlow::Open {
                listing: listing.clone(),
                pending: Some(HistoryRequest::Fetch { id }),
            };
            let ticket = state.ticket(ModalKind::History);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::Request(Call::FetchConversation { ticket, id })))
        }

        Event::HistoryDelete { id } => {
            if state.history == HistoryFlow::Closed {
                return Err(TransitionError::InvalidTransition(
                    "history modal is not open".to_string(),
                ));
            }
            next.confirmation = Some(Confirmation::DeleteConversation { id });
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render(ViewUpdate::Confirm(DELETE_PROMPT.to_string()))))
        }

        Event::ConversationsListed { ticket, result } => {
            history_completion(state, ticket, HistoryRequest::List)?;
            let (listing, update) = match result {
                Ok(records) => {
                    let update = renderer::history_modal(&records);
                    (Listing::Records(records), update)
                }
                Err(_) => (Listing::Failed, ViewUpdate::ShowHistory(HistoryView::Failed)),
            };
            next.history = HistoryFlow::Open {
                listing,
                pending: None,
            };
            Ok(TransitionResult::new(next).with_effect(Effect::render(update)))
        }

        Event::ConversationFetched { ticket, result } => {
            ensure_current(state, ticket)?;
            let HistoryFlow::Open { pending, .. } = &state.history else {
                return Err(TransitionError::StaleResponse(ModalKind::History));
            };
            let Some(HistoryRequest::Fetch { id }) = *pending else {
                return Err(TransitionError::UnexpectedCompletion("conversation fetch"));
            };
            let listing = history_completion(state, ticket, HistoryRequest::Fetch { id })?;
            match result {
                Ok(messages) => {
                    let mut effects = vec![Effect::ReplaceTranscript(messages)];
                    if state.options_visible() {
                        effects.push(Effect::render(ViewUpdate::HideOptions));
                        next.chat = ChatFlow::Idle;
                    }
                    next.history = HistoryFlow::Closed;
                    next.epochs.bump(ModalKind::History);
                    effects.push(Effect::render(ViewUpdate::CloseModal(ModalKind::History)));
                    effects.push(Effect::alert(LOADED));
                    Ok(TransitionResult::new(next).with_effects(effects))
                }
                Err(e) => {
                    next.history = HistoryFlow::Open {
                        listing,
                        pending: None,
                    };
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::alert(failure_alert("Loading failed", &e))))
                }
            }
        }

        Event::ConversationDeleted { ticket, result } => {
            ensure_current(state, ticket)?;
            let HistoryFlow::Open { pending, .. } = &state.history else {
                return Err(TransitionError::StaleResponse(ModalKind::History));
            };
            let Some(HistoryRequest::Delete { id }) = *pending else {
                return Err(TransitionError::UnexpectedCompletion("conversation delete"));
            };
            let listing = history_completion(state, ticket, HistoryRequest::Delete { id })?;
            match result {
                Ok(()) => {
                    next.history = HistoryFlow::Open {
                        listing: Listing::Loading,
                        pending: Some(HistoryRequest::List),
                    };
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::alert(DELETED))
                        .with_effect(Effect::render(ViewUpdate::ShowHistory(HistoryView::Loading)))
                        .with_effect(Effect::Request(Call::ListConversations { ticket })))
                }
                Err(e) => {
                    next.history = HistoryFlow::Open {
                        listing,
                        pending: None,
                    };
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::alert(failure_alert("Deleting failed", &e))))
                }
            }
        }

        // ============================================================
        // Save flow
        // ============================================================
        Event::SaveOpen => {
            if state.username().is_none() {
                return Err(TransitionError::NotSignedIn);
            }
            if context.transcript.is_empty() {
                return Ok(TransitionResult::new(next).with_effect(Effect::alert(NOTHING_TO_SAVE)));
            }
            let title = default_title(context.transcript);
            next.epochs.bump(ModalKind::Save);
            next.save = SaveFlow::Editing {
                title: title.clone(),
                error: None,
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render(renderer::save_modal(&title, None))))
        }

        Event::SaveTitleChanged { title } => match &state.save {
            SaveFlow::Editing { error, .. } => {
                next.save = SaveFlow::Editing {
                    title,
                    error: error.clone(),
                };
                Ok(TransitionResult::new(next))
            }
            SaveFlow::Submitting { .. } => Err(TransitionError::FlowBusy(ModalKind::Save)),
            SaveFlow::Closed => Err(TransitionError::InvalidTransition(
                "save dialog is not open".to_string(),
            )),
        },

        Event::SaveSubmit => {
            let title = match &state.save {
                SaveFlow::Editing { title, .. } => title.clone(),
                SaveFlow::Submitting { .. } => return Err(TransitionError::FlowBusy(ModalKind::Save)),
                SaveFlow::Closed => {
                    return Err(TransitionError::InvalidTransition(
                        "save dialog is not open".to_string(),
                    ))
                }
            };
            match validate_title(&title) {
                Err(e) => {
                    let error = e.to_string();
                    next.save = SaveFlow::Editing {
                        title: title.clone(),
                        error: Some(error.clone()),
                    };
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::render(renderer::save_modal(&title, Some(&error)))))
                }
                Ok(valid) => {
                    next.save = SaveFlow::Submitting {
                        title: title.clone(),
                    };
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::render(renderer::save_modal(&title, None)))
                        .with_effect(Effect::Request(Call::SaveConversation {
                            ticket: state.ticket(ModalKind::Save),
                            title: valid,
                            messages: context.transcript.messages().to_vec(),
                        })))
                }
            }
        }

        Event::SaveClose => {
            if state.save == SaveFlow::Closed {
                return Err(TransitionError::InvalidTransition(
                    "save dialog is not open".to_string(),
                ));
            }
            next.save = SaveFlow::Closed;
            next.epochs.bump(ModalKind::Save);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::render(ViewUpdate::CloseModal(ModalKind::Save))))
        }

        Event::ConversationSaved { ticket, result } => {
            ensure_current(state, ticket)?;
            let SaveFlow::Submitting { title } = &state.save else {
                return Err(TransitionError::UnexpectedCompletion("save"));
            };
            match result {
                Ok(_) => {
                    next.save = SaveFlow::Closed;
                    next.epochs.bump(ModalKind::Save);
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::render(ViewUpdate::CloseModal(ModalKind::Save)))
                        .with_effect(Effect::alert(SAVED)))
                }
                Err(e) => {
                    let error = match e.kind() {
                        FailureKind::Transport => NETWORK_ALERT.to_string(),
                        FailureKind::Application => e
                            .server_message()
                            .map_or_else(|| SAVE_FAILED.to_string(), str::to_string),
                    };
                    next.save = SaveFlow::Editing {
                        title: title.clone(),
                        error: Some(error.clone()),
                    };
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::render(renderer::save_modal(title, Some(&error)))))
                }
            }
        }
    }
}

/// Dispatch a chat turn with `text` as the user's message
fn submit_text(next: &mut SessionState, text: &str) -> Result<Vec<Effect>, TransitionError> {
    if next.is_awaiting_response() {
        return Err(TransitionError::AwaitingResponse);
    }
    let message = text.trim();
    if message.is_empty() {
        return Err(TransitionError::EmptyInput);
    }

    let mut effects = vec![
        Effect::AppendMessage(MessageDraft::user(message)),
        Effect::render(ViewUpdate::SetInput(String::new())),
    ];
    if next.options_visible() {
        effects.push(Effect::render(ViewUpdate::HideOptions));
    }
    effects.push(Effect::render(ViewUpdate::ShowLoading(LoadingSlot::Chat)));
    effects.push(Effect::Request(Call::SendChat {
        message: message.to_string(),
    }));

    next.input.clear();
    next.chat = ChatFlow::AwaitingResponse {
        request: MainRequest::ChatTurn,
    };
    Ok(effects)
}

/// Turn a successful chat reply into transcript effects; returns the next
/// main-flow state.
fn classify_reply(reply: AgentReply, effects: &mut Vec<Effect>) -> ChatFlow {
    if reply.clear_history {
        effects.push(Effect::ClearTranscript);
        effects.push(Effect::assistant_message(WELCOME_TEXT));
    }

    let AgentReply { content, kind, .. } = reply;
    match kind {
        ReplyKind::Question { options } => {
            let draft = MessageDraft::assistant(content).with_body(MessageBody::Question {
                options: options.clone(),
            });
            effects.push(Effect::AppendMessage(draft));
            if options.is_empty() {
                ChatFlow::Idle
            } else {
                effects.push(Effect::render(renderer::option_grid(&options)));
                ChatFlow::OptionsPresented { options }
            }
        }
        ReplyKind::Results { results } => {
            effects.push(Effect::AppendMessage(
                MessageDraft::assistant(content).with_body(MessageBody::Results { results }),
            ));
            ChatFlow::Idle
        }
        ReplyKind::Reset => {
            effects.push(Effect::AppendMessage(
                MessageDraft::assistant(content).with_body(MessageBody::Reset),
            ));
            ChatFlow::Idle
        }
        ReplyKind::Plain => {
            effects.push(Effect::assistant_message(content));
            ChatFlow::Idle
        }
    }
}

fn start_delete(next: &mut SessionState, id: i64) -> Result<Vec<Effect>, TransitionError> {
    let HistoryFlow::Open { listing, pending } = &next.history else {
        // Modal closed while the prompt was up; nothing to delete from
        return Ok(vec![]);
    };
    if pending.is_some() {
        return Err(TransitionError::FlowBusy(ModalKind::History));
    }
    next.history = HistoryFlow::Open {
        listing: listing.clone(),
        pending: Some(HistoryRequest::Delete { id }),
    };
    Ok(vec![Effect::Request(Call::DeleteConversation {
        ticket: next.ticket(ModalKind::History),
        id,
    })])
}

fn ensure_current(state: &SessionState, ticket: Ticket) -> Result<(), TransitionError> {
    if state.is_current(ticket) {
        Ok(())
    } else {
        Err(TransitionError::StaleResponse(ticket.flow))
    }
}

/// Check a history completion against the open modal session and return the
/// listing to keep showing.
fn history_completion(
    state: &SessionState,
    ticket: Ticket,
    expected: HistoryRequest,
) -> Result<Listing, TransitionError> {
    ensure_current(state, ticket)?;
    match &state.history {
        HistoryFlow::Open {
            listing,
            pending: Some(pending),
        } if *pending == expected => Ok(listing.clone()),
        HistoryFlow::Open { .. } => Err(TransitionError::UnexpectedCompletion("history")),
        HistoryFlow::Closed => Err(TransitionError::StaleResponse(ModalKind::History)),
    }
}

fn failure_alert(prefix: &str, error: &ProtocolError) -> String {
    match error.kind() {
        FailureKind::Transport => NETWORK_ALERT.to_string(),
        FailureKind::Application => {
            format!("{prefix}: {}", error.server_message().unwrap_or(UNKNOWN_ERROR))
        }
    }
}
