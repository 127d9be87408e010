//! Property-based tests for the session state machine
//!
//! Random event sequences are folded through `transition` while a model
//! transcript applies the effects, the same way the runtime does.

use super::effect::Call;
use super::state::*;
use super::transition::*;
use super::*;
use crate::protocol::{AgentReply, Confidence, Correction, ProtocolError, ReplyKind};
use crate::renderer::ModalKind;
use crate::transcript::{MessageBody, TranscriptStore};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

/// Apply transcript effects the way the runtime does; returns issued calls
fn apply_effects(transcript: &mut TranscriptStore, effects: Vec<Effect>) -> Vec<Call> {
    let stamp = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let mut calls = Vec::new();
    for effect in effects {
        match effect {
            Effect::AppendMessage(draft) => transcript.append(draft.stamp(stamp)),
            Effect::ClearTranscript => transcript.clear(),
            Effect::ReplaceTranscript(messages) => transcript.replace_all(messages),
            Effect::Render(_) => {}
            Effect::Request(call) => calls.push(call),
        }
    }
    calls
}

/// Run one event; rejected events leave everything untouched
fn step(state: &mut SessionState, transcript: &mut TranscriptStore, event: Event) -> Vec<Call> {
    match transition(state, &SessionContext::new(transcript), event) {
        Ok(result) => {
            *state = result.new_state;
            apply_effects(transcript, result.effects)
        }
        Err(_) => vec![],
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_reply_kind() -> impl Strategy<Value = ReplyKind> {
    prop_oneof![
        prop::collection::vec("[a-zA-Z ]{1,12}", 0..5)
            .prop_map(|options| ReplyKind::Question { options }),
        Just(ReplyKind::Results {
            results: serde_json::json!([{"name": "fuse.pdf"}])
        }),
        Just(ReplyKind::Reset),
        Just(ReplyKind::Plain),
    ]
}

fn arb_reply() -> impl Strategy<Value = AgentReply> {
    ("[a-zA-Z ]{0,30}", any::<bool>(), arb_reply_kind()).prop_map(
        |(content, clear_history, kind)| AgentReply {
            content,
            clear_history,
            kind,
        },
    )
}

fn arb_protocol_error() -> impl Strategy<Value = ProtocolError> {
    prop_oneof![
        "[a-z ]{1,10}".prop_map(ProtocolError::transport),
        prop::option::of("[a-z ]{1,10}").prop_map(ProtocolError::application),
    ]
}

fn arb_chat_result() -> impl Strategy<Value = Result<AgentReply, ProtocolError>> {
    prop_oneof![
        3 => arb_reply().prop_map(Ok),
        1 => arb_protocol_error().prop_map(Err),
    ]
}

fn correction() -> Correction {
    Correction {
        original: "sani".into(),
        corrected: "Sany".into(),
        explanation: "brand".into(),
        confidence: Confidence::Medium,
    }
}

/// User-side events; completions are produced by the harness
fn arb_user_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-zA-Z ]{0,15}".prop_map(|text| Event::InputChanged { text }),
        Just(Event::Submit),
        (0usize..6).prop_map(|index| Event::OptionSelected { index }),
        Just(Event::BackClicked),
        Just(Event::ResetClicked),
        Just(Event::ShowResultsClicked),
        any::<bool>().prop_map(|accepted| Event::Confirm { accepted }),
        Just(Event::ClearInput),
        Just(Event::FuzzyClicked),
        Just(Event::FuzzyDismiss),
        Just(Event::FuzzyAccept),
    ]
}

#[derive(Debug, Clone)]
enum Step {
    User(Event),
    CompleteChat(Result<AgentReply, ProtocolError>),
    CompleteFuzzy,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => arb_user_event().prop_map(Step::User),
        2 => arb_chat_result().prop_map(Step::CompleteChat),
        1 => Just(Step::CompleteFuzzy),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Never more than one main-flow request outstanding
    #[test]
    fn prop_single_main_request_in_flight(steps in prop::collection::vec(arb_step(), 1..60)) {
        let mut state = SessionState::new();
        let mut transcript = TranscriptStore::new();
        let mut outstanding: Vec<Call> = Vec::new();
        let mut fuzzy: Vec<Ticket> = Vec::new();

        for s in steps {
            let calls = match s {
                Step::User(event) => step(&mut state, &mut transcript, event),
                Step::CompleteChat(result) => match outstanding.pop() {
                    Some(Call::SendChat { .. }) => {
                        step(&mut state, &mut transcript, Event::ChatCompleted { result })
                    }
                    Some(_) => {
                        let result = result.map(|r| r.content);
                        step(&mut state, &mut transcript, Event::CurrentResultsCompleted { result })
                    }
                    None => vec![],
                },
                Step::CompleteFuzzy => match fuzzy.pop() {
                    Some(ticket) => step(
                        &mut state,
                        &mut transcript,
                        Event::FuzzyCompleted { ticket, result: Ok(correction()) },
                    ),
                    None => vec![],
                },
            };

            for call in calls {
                if call.is_main_flow() {
                    prop_assert!(outstanding.is_empty(), "second main request: {:?}", call);
                    outstanding.push(call);
                } else if let Call::FuzzyCorrect { ticket, .. } = call {
                    fuzzy.push(ticket);
                }
            }
            prop_assert_eq!(state.is_awaiting_response(), !outstanding.is_empty());
        }
    }

    /// Each accepted turn adds the user message plus exactly one reply
    #[test]
    fn prop_transcript_grows_two_per_turn(
        turns in prop::collection::vec(("[a-zA-Z]{1,10}", arb_chat_result()), 1..20)
    ) {
        let mut state = SessionState::new();
        let mut transcript = TranscriptStore::new();

        for (text, result) in turns {
            let clears = matches!(&result, Ok(r) if r.clear_history);
            let before = transcript.len();
            step(&mut state, &mut transcript, Event::InputChanged { text });
            let calls = step(&mut state, &mut transcript, Event::Submit);
            prop_assert_eq!(calls.len(), 1);
            step(&mut state, &mut transcript, Event::ChatCompleted { result });

            if clears {
                prop_assert_eq!(transcript.len(), 2);
                prop_assert_eq!(&transcript.messages()[0].content, WELCOME_TEXT);
            } else {
                prop_assert_eq!(transcript.len(), before + 2);
            }
            prop_assert!(!state.is_awaiting_response());
        }
    }

    /// Clicking an option is indistinguishable from typing its text
    #[test]
    fn prop_option_click_equals_typing(
        options in prop::collection::vec("[a-zA-Z][a-zA-Z ]{0,10}", 1..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let index = pick.index(options.len());
        let presented = SessionState {
            chat: ChatFlow::OptionsPresented { options: options.clone() },
            ..SessionState::new()
        };
        let transcript = TranscriptStore::new();
        let ctx = SessionContext::new(&transcript);

        let clicked = transition(&presented, &ctx, Event::OptionSelected { index }).unwrap();
        let typed_state = SessionState {
            input: options[index].clone(),
            ..presented.clone()
        };
        let typed = transition(&typed_state, &ctx, Event::Submit).unwrap();

        prop_assert_eq!(clicked.effects, typed.effects);
        prop_assert_eq!(clicked.new_state.chat, typed.new_state.chat);
    }

    /// Reset with clear leaves exactly the welcome and the confirmation
    #[test]
    fn prop_reset_leaves_welcome_and_confirmation(history in prop::collection::vec("[a-z]{1,8}", 0..10)) {
        let mut state = SessionState::new();
        let mut transcript = TranscriptStore::new();
        for text in history {
            step(&mut state, &mut transcript, Event::InputChanged { text });
            step(&mut state, &mut transcript, Event::Submit);
            step(&mut state, &mut transcript, Event::ChatCompleted {
                result: Ok(AgentReply { content: "ok".into(), clear_history: false, kind: ReplyKind::Plain }),
            });
        }

        step(&mut state, &mut transcript, Event::ResetClicked);
        let calls = step(&mut state, &mut transcript, Event::Confirm { accepted: true });
        prop_assert_eq!(calls, vec![Call::SendChat { message: RESET_COMMAND.into() }]);
        step(&mut state, &mut transcript, Event::ChatCompleted {
            result: Ok(AgentReply { content: "Conversation reset".into(), clear_history: true, kind: ReplyKind::Reset }),
        });

        prop_assert_eq!(transcript.len(), 2);
        prop_assert_eq!(&transcript.messages()[0].content, WELCOME_TEXT);
        prop_assert_eq!(&transcript.messages()[1].body, &MessageBody::Reset);
    }

    /// Titles are accepted iff the trimmed text has 1..=200 characters
    #[test]
    fn prop_title_bounds(core in "[a-zA-Z电]{0,220}", pad in " {0,3}") {
        let raw = format!("{pad}{core}{pad}");
        let len = core.chars().count();
        match validate_title(&raw) {
            Ok(title) => {
                prop_assert!((1..=MAX_TITLE_CHARS).contains(&len));
                prop_assert_eq!(title, core);
            }
            Err(TitleError::Empty) => prop_assert_eq!(len, 0),
            Err(TitleError::TooLong) => prop_assert!(len > MAX_TITLE_CHARS),
        }
    }

    /// Whitespace-only input never reaches the network
    #[test]
    fn prop_blank_input_issues_no_request(blank in "[ \t\n]{0,8}") {
        let state = SessionState { input: blank, ..SessionState::new() };
        let transcript = TranscriptStore::new();
        let ctx = SessionContext::new(&transcript);

        prop_assert!(transition(&state, &ctx, Event::Submit).is_err());
        let fuzzy = transition(&state, &ctx, Event::FuzzyClicked).unwrap();
        prop_assert!(!fuzzy.effects.iter().any(|e| matches!(e, Effect::Request(_))));
    }

    /// Completions carrying a superseded ticket are always rejected
    #[test]
    fn prop_stale_modal_completion_rejected(bumps in 1u64..5) {
        let mut state = SessionState {
            auth: AuthState::SignedIn { username: "u".into() },
            ..SessionState::new()
        };
        let stale = state.epochs.bump(ModalKind::History);
        for _ in 0..bumps {
            state.epochs.bump(ModalKind::History);
        }
        state.history = HistoryFlow::Open {
            listing: Listing::Loading,
            pending: Some(HistoryRequest::List),
        };
        let transcript = TranscriptStore::new();
        let result = transition(
            &state,
            &SessionContext::new(&transcript),
            Event::ConversationsListed { ticket: stale, result: Ok(vec![]) },
        );
        prop_assert_eq!(result.unwrap_err(), TransitionError::StaleResponse(ModalKind::History));
    }
}
