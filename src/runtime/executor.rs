//! Session runtime executor

use crate::protocol::ProtocolClient;
use crate::renderer::{self, ViewUpdate};
use crate::state_machine::{
    transition, Call, Effect, Event, SessionContext, SessionState, TransitionError,
};
use crate::transcript::TranscriptStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Owns one session's state and transcript and executes effects against a
/// protocol client
pub struct SessionRuntime<C>
where
    C: ProtocolClient + 'static,
{
    state: SessionState,
    transcript: TranscriptStore,
    client: Arc<C>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    updates_tx: broadcast::Sender<ViewUpdate>,
}

impl<C> SessionRuntime<C>
where
    C: ProtocolClient + 'static,
{
    pub fn new(
        client: Arc<C>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        updates_tx: broadcast::Sender<ViewUpdate>,
    ) -> Self {
        Self {
            state: SessionState::new(),
            transcript: TranscriptStore::new(),
            client,
            event_rx,
            event_tx,
            updates_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Starting session runtime");

        // Spawned calls hold clones of our sender, so the loop lives as long
        // as the session.
        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event);
        }

        tracing::info!("Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let completion = event.is_completion();
        let result = match transition(
            &self.state,
            &SessionContext::new(&self.transcript),
            event,
        ) {
            Ok(r) => r,
            Err(TransitionError::StaleResponse(flow)) => {
                tracing::debug!(?flow, "Discarding response from a closed modal session");
                return;
            }
            Err(e) if completion => {
                tracing::warn!(error = %e, "Completion did not match session state");
                return;
            }
            Err(e) if e.is_user_facing() => {
                tracing::debug!(error = %e, "Rejected user event");
                self.publish(ViewUpdate::Alert(e.to_string()));
                return;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring event");
                return;
            }
        };

        self.state = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage(draft) => {
                let message = draft.stamp(Utc::now());
                self.publish(renderer::message_appended(&message));
                self.transcript.append(message);
            }

            Effect::ClearTranscript => {
                self.transcript.clear();
                self.publish(ViewUpdate::Clear);
            }

            Effect::ReplaceTranscript(messages) => {
                self.publish(ViewUpdate::Clear);
                for message in &messages {
                    self.publish(renderer::message_appended(message));
                }
                self.transcript.replace_all(messages);
            }

            Effect::Render(update) => self.publish(update),

            Effect::Request(call) => self.spawn_call(call),
        }
    }

    fn publish(&self, update: ViewUpdate) {
        // No subscribers is fine; a host may attach later
        let _ = self.updates_tx.send(update);
    }

    /// Run a remote call in the background and post its completion event back
    fn spawn_call(&self, call: Call) {
        let client = self.client.clone();
        let event_tx = self.event_tx.clone();
        let name = call.name();

        tokio::spawn(async move {
            tracing::debug!(call = name, "Dispatching backend request");
            let event = match call {
                Call::OpenSession => Event::SessionOpened {
                    result: client.open_session().await,
                },
                Call::SendChat { message } => Event::ChatCompleted {
                    result: client.send_chat(&message).await,
                },
                Call::ShowCurrentResults => Event::CurrentResultsCompleted {
                    result: client.show_current_results().await,
                },
                Call::FuzzyCorrect { ticket, query } => Event::FuzzyCompleted {
                    ticket,
                    result: client.fuzzy_correct(&query).await,
                },
                Call::ServerStatus => {
                    let result = client.server_status().await;
                    match &result {
                        Ok(status) if status.is_ok() => {
                            tracing::info!(data_count = status.data_count, "Backend is up");
                        }
                        Ok(status) => {
                            tracing::warn!(status = %status.status, "Backend reported a problem");
                        }
                        Err(_) => {}
                    }
                    Event::StatusChecked { result }
                }
                Call::AuthStatus => Event::AuthChecked {
                    result: client.auth_status().await,
                },
                Call::ListConversations { ticket } => Event::ConversationsListed {
                    ticket,
                    result: client.list_conversations().await,
                },
                Call::FetchConversation { ticket, id } => Event::ConversationFetched {
                    ticket,
                    result: client.fetch_conversation(id).await,
                },
                Call::SaveConversation {
                    ticket,
                    title,
                    messages,
                } => Event::ConversationSaved {
                    ticket,
                    result: client.save_conversation(&title, &messages).await,
                },
                Call::DeleteConversation { ticket, id } => Event::ConversationDeleted {
                    ticket,
                    result: client.delete_conversation(id).await,
                },
                Call::Logout => Event::LoggedOut {
                    result: client.logout().await,
                },
            };

            if event_tx.send(event).await.is_err() {
                tracing::debug!(call = name, "Session closed before response arrived");
            }
        });
    }
}
