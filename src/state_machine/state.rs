//! Query lifecycle states

use serde::{Deserialize, Serialize};

/// Where the session is in the submit/await/reconcile cycle
///
/// `Succeeded` and `Failed` are accepting states like `Idle`; modeling them
/// explicitly lets the UI gate its retry affordance without re-deriving the
/// outcome from the transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatState {
    /// Ready for input, nothing in flight
    #[default]
    Idle,

    /// One query in flight, placeholder appended, awaiting settle
    Submitting { question: String },

    /// Last query reconciled with a grounded answer
    Succeeded,

    /// Last query reconciled with an error
    Failed,
}

impl ChatState {
    /// Whether a new submission may be accepted
    pub fn is_accepting(&self) -> bool {
        !self.is_submitting()
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, ChatState::Submitting { .. })
    }
}
