//! Session state machine
//!
//! Pure transitions in the Elm style: the runtime feeds events in and
//! executes the effects that come out.

pub mod effect;
pub mod event;
pub mod state;
pub mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Call, Effect};
pub use event::Event;
pub use state::{SessionContext, SessionState};
pub use transition::{transition, TransitionError, TransitionResult};
