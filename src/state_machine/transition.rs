//! Pure state transition function
//!
//! Given the current state, a read-only view of the transcript, and an
//! event, produces the next state plus the effects to apply. No I/O and no
//! mutation happen here.

use super::{ChatState, Effect, Event};
use crate::rag::{QueryRequest, RagError, RagErrorKind, ResponsePayload};
use crate::session::{Message, MessagePatch, Role};
use thiserror::Error;

pub(crate) const EMPTY_QUERY_ERROR: &str = "Query cannot be empty";
pub(crate) const FALLBACK_ANSWER: &str = "No relevant content found";
pub(crate) const NO_CONTEXT_MESSAGE: &str = "Sorry, I cannot find the answer in the book.";
pub(crate) const NO_CONTEXT_BANNER: &str = "No relevant book content found";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
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
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("A query is already in flight")]
    QueryInFlight,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// The transcript is only read, for validation and the retry target lookup;
/// all mutation is expressed as effects.
pub fn transition(
    state: &ChatState,
    transcript: &[Message],
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Compare-and-swap guard: one query in flight at a time. The UI
        // disables its submit control while loading; this backs it up for
        // non-UI-gated callers.
        (ChatState::Submitting { .. }, Event::Submit { .. } | Event::Retry) => {
            Err(TransitionError::QueryInFlight)
        }

        // Defensive validation: resolved locally, nothing reaches the
        // network and nothing is appended.
        (_, Event::Submit { query }) if query.trim().is_empty() => {
            Ok(TransitionResult::new(state.clone())
                .with_effect(Effect::SetError(Some(EMPTY_QUERY_ERROR.to_string()))))
        }

        (_, Event::Submit { query }) => {
            Ok(TransitionResult::new(ChatState::Submitting {
                question: query.clone(),
            })
            .with_effects(submit_effects(query)))
        }

        (ChatState::Submitting { .. }, Event::Completed(payload)) => Ok(complete(payload)),

        (ChatState::Submitting { .. }, Event::Failed(error)) => Ok(fail(&error)),

        (_, Event::Retry) => Ok(retry(state, transcript)),

        // A settle event without a query in flight is stale.
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

/// The append/flag/send sequence shared by submit and retry.
/// Ordering is part of the contract: user message, then placeholder, then
/// flags, and the network call last.
fn submit_effects(question: String) -> [Effect; 5] {
    [
        Effect::AppendUser(question.clone()),
        Effect::AppendPlaceholder,
        Effect::SetLoading(true),
        Effect::SetError(None),
        Effect::SendQuery(QueryRequest::new(question)),
    ]
}

fn complete(payload: ResponsePayload) -> TransitionResult {
    // Strict grounding: a response without sources is presented as a
    // failure and the generated answer, if any, is suppressed.
    if payload.sources.is_empty() {
        return TransitionResult::new(ChatState::Failed)
            .with_effect(Effect::ReconcileLast(MessagePatch::errored(
                RagErrorKind::NoContext,
                NO_CONTEXT_MESSAGE,
            )))
            .with_effect(Effect::SetLoading(false))
            .with_effect(Effect::SetError(Some(NO_CONTEXT_BANNER.to_string())));
    }

    let content = if payload.answer.trim().is_empty() {
        FALLBACK_ANSWER.to_string()
    } else {
        payload.answer.clone()
    };

    TransitionResult::new(ChatState::Succeeded)
        .with_effect(Effect::reconcile_answer(content, &payload))
        .with_effect(Effect::SetLoading(false))
        .with_effect(Effect::SetError(None))
}

fn fail(error: &RagError) -> TransitionResult {
    TransitionResult::new(ChatState::Failed)
        .with_effect(Effect::reconcile_error(error))
        .with_effect(Effect::SetLoading(false))
        .with_effect(Effect::SetError(Some(error.message.clone())))
}

/// Retry is valid only when the transcript ends in a failed assistant
/// message and a user message exists to replay; anything else is a silent
/// no-op.
fn retry(state: &ChatState, transcript: &[Message]) -> TransitionResult {
    if transcript.len() < 2 {
        return TransitionResult::new(state.clone());
    }
    let failed_tail = transcript.last().is_some_and(Message::is_failed_assistant);
    if !failed_tail {
        return TransitionResult::new(state.clone());
    }
    let Some(user) = transcript.iter().rev().find(|m| m.role == Role::User) else {
        return TransitionResult::new(state.clone());
    };

    let question = user.content.clone();
    TransitionResult::new(ChatState::Submitting {
        question: question.clone(),
    })
    .with_effect(Effect::RemoveLast)
    .with_effects(submit_effects(question))
}
