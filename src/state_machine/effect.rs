//! Effects produced by state transitions

use crate::rag::{QueryRequest, RagError, ResponsePayload};
use crate::session::MessagePatch;

/// Effects to be executed by the orchestrator after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a user message with the given content
    AppendUser(String),

    /// Append the empty assistant placeholder
    AppendPlaceholder,

    /// Merge a patch into the last transcript message
    ReconcileLast(MessagePatch),

    /// Remove the last transcript message (retry)
    RemoveLast,

    /// Set the session loading flag
    SetLoading(bool),

    /// Set or clear the session error banner
    SetError(Option<String>),

    /// Perform the network call; always the final effect when present
    SendQuery(QueryRequest),
}

impl Effect {
    pub fn reconcile_answer(content: impl Into<String>, payload: &ResponsePayload) -> Self {
        Effect::ReconcileLast(MessagePatch::answered(content, payload.sources.clone()))
    }

    pub fn reconcile_error(error: &RagError) -> Self {
        Effect::ReconcileLast(MessagePatch::errored(error.kind, error.message.clone()))
    }
}
