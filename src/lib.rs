//! Circuit Chat - client session controller for the circuit diagram assistant
//!
//! Owns the transcript, the chat flow and the modal flows of one session and
//! talks to the backend over its JSON API. Hosts feed it events and render the
//! view updates it publishes.

pub mod config;
pub mod protocol;
pub mod renderer;
pub mod runtime;
pub mod state_machine;
pub mod transcript;
