//! Query lifecycle state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the transition function inspects the current state and a read-only view
//! of the transcript, and returns effects for the orchestrator to execute.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::ChatState;
pub use transition::{transition, TransitionError};
