//! Query orchestrator: drives the submit -> placeholder -> await ->
//! reconcile lifecycle by feeding events through the state machine and
//! executing the resulting effects against the session store.

use crate::rag::{QueryRequest, RagClient, RagError, ResponsePayload};
use crate::session::{Role, SelectionSource, SessionStore};
use crate::state_machine::{transition, ChatState, Effect, Event, TransitionError};
use std::sync::Arc;
use std::time::Instant;

pub struct Orchestrator {
    store: SessionStore,
    state: ChatState,
    client: Arc<dyn RagClient>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn RagClient>, max_messages: usize) -> Self {
        Self {
            store: SessionStore::new(max_messages),
            state: ChatState::default(),
            client,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Shared transport client, for hosts that run the network call on
    /// their own task (see the phase API below).
    pub fn client(&self) -> Arc<dyn RagClient> {
        Arc::clone(&self.client)
    }

    /// Whether the retry affordance should be offered
    pub fn can_retry(&self) -> bool {
        self.state == ChatState::Failed
            && self
                .store
                .transcript()
                .last()
                .is_some_and(crate::session::Message::is_failed_assistant)
    }

    pub fn dismiss_error(&mut self) {
        self.store.set_error(None);
    }

    /// Empty the transcript. Flags are untouched, per the store contract.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    // ------------------------------------------------------------------
    // Phase API for event-loop hosts
    //
    // A TUI must keep drawing while a request is in flight, so the
    // lifecycle splits into begin (appends + flags, returns the request to
    // send) and finish (reconciliation). `submit_query`/`retry` below are
    // the single-await composition of the two.
    // ------------------------------------------------------------------

    /// Start a submission; returns the request to send, or `None` when the
    /// event was resolved locally (blank query, in-flight guard).
    pub fn begin_submit(&mut self, query: &str) -> Option<QueryRequest> {
        self.dispatch(Event::Submit {
            query: query.to_string(),
        })
    }

    /// Start a retry of the last failed exchange; `None` when there is
    /// nothing to retry or a query is already in flight.
    pub fn begin_retry(&mut self) -> Option<QueryRequest> {
        self.dispatch(Event::Retry)
    }

    /// Reconcile the settled request back into the store.
    pub fn finish(&mut self, result: Result<ResponsePayload, RagError>) {
        let event = match result {
            Ok(payload) => Event::Completed(payload),
            Err(error) => Event::Failed(error),
        };
        self.dispatch(event);
    }

    /// Full submit lifecycle. The client call is the single suspension
    /// point; no store mutation happens while it is pending.
    #[allow(dead_code)] // Event-loop hosts go through the phase API instead
    pub async fn submit_query(&mut self, query: &str) {
        let Some(request) = self.begin_submit(query) else {
            return;
        };
        self.run_request(request).await;
    }

    /// Full retry lifecycle; silent no-op when retry is not applicable.
    #[allow(dead_code)] // Event-loop hosts go through the phase API instead
    pub async fn retry(&mut self) {
        let Some(request) = self.begin_retry() else {
            return;
        };
        self.run_request(request).await;
    }

    async fn run_request(&mut self, request: QueryRequest) {
        let start = Instant::now();
        let result = self.client.submit_query(&request).await;

        let outcome = match &result {
            Ok(payload) if payload.sources.is_empty() => "no_context",
            Ok(_) => "ok",
            Err(e) => e.kind.code(),
        };
        tracing::info!(
            session_id = %self.store.session_id(),
            question_len = request.question.len(),
            outcome,
            duration_ms = %start.elapsed().as_millis(),
            "Query settled"
        );

        self.finish(result);
    }

    /// Pure text transform: prefix the recorded selection as a context
    /// block. Identity when no selection is recorded; never mutates it.
    pub fn insert_selected_text(&self, query: &str) -> String {
        match self.store.selected_text() {
            Some(selected) => format!("{query}\n\nContext: {selected}"),
            None => query.to_string(),
        }
    }

    /// Capture the host selection into the store
    pub fn capture_selection(&mut self, source: &mut dyn SelectionSource) -> Option<String> {
        self.store.capture_selection(source)
    }

    fn dispatch(&mut self, event: Event) -> Option<QueryRequest> {
        match transition(&self.state, self.store.transcript(), event) {
            Ok(result) => {
                self.state = result.new_state;
                self.apply(result.effects)
            }
            // The UI disables its controls while loading, so a refused
            // duplicate is expected, not alarming.
            Err(TransitionError::QueryInFlight) => {
                tracing::debug!(
                    session_id = %self.store.session_id(),
                    "Event refused: query already in flight"
                );
                None
            }
            Err(err) => {
                tracing::warn!(
                    session_id = %self.store.session_id(),
                    error = %err,
                    "Event refused"
                );
                None
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) -> Option<QueryRequest> {
        let mut request = None;
        for effect in effects {
            match effect {
                Effect::AppendUser(content) => self.store.append(Role::User, content),
                Effect::AppendPlaceholder => self.store.append(Role::Assistant, ""),
                Effect::ReconcileLast(patch) => self.store.update_last(patch),
                Effect::RemoveLast => {
                    self.store.remove_last();
                }
                Effect::SetLoading(loading) => self.store.set_loading(loading),
                Effect::SetError(error) => self.store.set_error(error),
                Effect::SendQuery(req) => request = Some(req),
            }
        }
        request
    }
}
