//! Runtime for driving a chat session
//!
//! Events go in over an mpsc channel; view updates come out over a broadcast
//! channel so any number of hosts can render the same session.

mod executor;


pub use executor::SessionRuntime;

use crate::protocol::ProtocolClient;
use crate::renderer::ViewUpdate;
use crate::state_machine::Event;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

const EVENT_CHANNEL_CAPACITY: usize = 32;
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub updates_tx: broadcast::Sender<ViewUpdate>,
}

impl SessionHandle {
    /// Receive every view update published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ViewUpdate> {
        self.updates_tx.subscribe()
    }

    /// Queue an event; fails only when the runtime has stopped
    pub async fn send(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>> {
        self.event_tx.send(event).await
    }
}

/// Spawn a runtime for a fresh session on the current tokio runtime
pub fn spawn_session<C>(client: C) -> SessionHandle
where
    C: ProtocolClient + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (updates_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

    let runtime = SessionRuntime::new(
        Arc::new(client),
        event_rx,
        event_tx.clone(),
        updates_tx.clone(),
    );
    tokio::spawn(async move {
        runtime.run().await;
    });

    SessionHandle {
        event_tx,
        updates_tx,
    }
}
