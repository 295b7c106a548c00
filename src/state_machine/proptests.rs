//! Property-based tests for the state machine
//!
//! These drive the pure transition function against a real session store
//! and verify key invariants hold across generated event sequences.

use super::transition::transition;
use super::{ChatState, Effect, Event};
use crate::rag::{QueryRequest, RagError, RagErrorKind, ResponsePayload, SourceRef};
use crate::session::{Role, SessionStore};
use proptest::prelude::*;

// ============================================================================
// Effect interpreter (mirrors the orchestrator's apply loop)
// ============================================================================

fn apply(store: &mut SessionStore, effects: Vec<Effect>) -> Option<QueryRequest> {
    let mut request = None;
    for effect in effects {
        match effect {
            Effect::AppendUser(content) => store.append(Role::User, content),
            Effect::AppendPlaceholder => store.append(Role::Assistant, ""),
            Effect::ReconcileLast(patch) => store.update_last(patch),
            Effect::RemoveLast => {
                store.remove_last();
            }
            Effect::SetLoading(loading) => store.set_loading(loading),
            Effect::SetError(error) => store.set_error(error),
            Effect::SendQuery(req) => request = Some(req),
        }
    }
    request
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_source() -> impl Strategy<Value = SourceRef> {
    ("[a-z/]{1,12}", "[A-Za-z ]{1,12}", 0.0f64..=1.0).prop_map(|(url, label, relevance)| {
        SourceRef {
            url,
            label,
            relevance,
        }
    })
}

fn arb_payload() -> impl Strategy<Value = ResponsePayload> {
    (
        "[a-zA-Z ]{0,30}",
        proptest::collection::vec(arb_source(), 0..3),
    )
        .prop_map(|(answer, sources)| ResponsePayload { answer, sources })
}

fn arb_error_kind() -> impl Strategy<Value = RagErrorKind> {
    prop_oneof![
        Just(RagErrorKind::Network),
        Just(RagErrorKind::Timeout),
        Just(RagErrorKind::Server),
        Just(RagErrorKind::Unknown),
    ]
}

fn arb_error() -> impl Strategy<Value = RagError> {
    ("[a-zA-Z ]{1,30}", arb_error_kind())
        .prop_map(|(message, kind)| RagError::new(kind, message))
}

fn arb_submit_event() -> impl Strategy<Value = Event> {
    // Includes blank and whitespace-only queries on purpose.
    prop_oneof![
        "[a-z ]{0,20}".prop_map(|query| Event::Submit { query }),
        Just(Event::Submit {
            query: "   ".to_string()
        }),
    ]
}

fn arb_settle_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_payload().prop_map(Event::Completed),
        arb_error().prop_map(Event::Failed),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_submit_event(),
        arb_settle_event(),
        Just(Event::Retry),
    ]
}

// ============================================================================
// Effect list checkers
// ============================================================================

fn effects_are_well_formed(effects: &[Effect]) -> bool {
    let send_count = effects
        .iter()
        .filter(|e| matches!(e, Effect::SendQuery(_)))
        .count();
    if send_count > 1 {
        return false;
    }
    // The network call is always the final effect when present.
    if send_count == 1 && !matches!(effects.last(), Some(Effect::SendQuery(_))) {
        return false;
    }

    let user_idx = effects
        .iter()
        .position(|e| matches!(e, Effect::AppendUser(_)));
    let placeholder_idx = effects
        .iter()
        .position(|e| matches!(e, Effect::AppendPlaceholder));
    match (user_idx, placeholder_idx) {
        // The user message always precedes its placeholder,
        (Some(u), Some(p)) => u < p,
        // and a placeholder never appears without one.
        (None, Some(_)) => false,
        _ => true,
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    // The machine never wedges: any accepted event produces well-formed
    // effects, SendQuery appears exactly when the machine enters
    // Submitting, and a pending submission can always be settled.
    #[test]
    fn prop_machine_never_wedges(events in proptest::collection::vec(arb_event(), 0..25)) {
        let mut store = SessionStore::new(100);
        let mut state = ChatState::default();

        for event in events {
            let len_before = store.transcript().len();
            match transition(&state, store.transcript(), event) {
                Ok(result) => {
                    prop_assert!(
                        effects_are_well_formed(&result.effects),
                        "malformed effects: {:?}",
                        result.effects
                    );
                    let entering_submitting = result.new_state.is_submitting();
                    let request = apply(&mut store, result.effects);
                    prop_assert_eq!(request.is_some(), entering_submitting);
                    state = result.new_state;
                }
                Err(_) => {
                    // Refused events leave the transcript untouched.
                    prop_assert_eq!(store.transcript().len(), len_before);
                }
            }
        }

        if state.is_submitting() {
            let result = transition(
                &state,
                store.transcript(),
                Event::Failed(RagError::network("settle")),
            );
            prop_assert!(result.is_ok());
            prop_assert!(result.unwrap().new_state.is_accepting());
        }
    }

    // Every accepted submission appends exactly a user message followed by
    // an empty assistant placeholder.
    #[test]
    fn prop_accepted_submit_appends_user_then_placeholder(query in "[a-z][a-z ]{0,20}") {
        let mut store = SessionStore::new(100);
        let result = transition(
            &ChatState::Idle,
            store.transcript(),
            Event::Submit { query: query.clone() },
        )
        .unwrap();
        let request = apply(&mut store, result.effects);

        prop_assert_eq!(store.transcript().len(), 2);
        prop_assert_eq!(store.transcript()[0].role, Role::User);
        prop_assert_eq!(&store.transcript()[0].content, &query);
        prop_assert_eq!(store.transcript()[1].role, Role::Assistant);
        prop_assert!(store.transcript()[1].content.is_empty());
        prop_assert!(store.loading());
        prop_assert_eq!(request.map(|r| r.question), Some(query));
    }

    // A submission always settles to an accepting state with loading off,
    // and the assistant message ends up with either content or an error,
    // never both.
    #[test]
    fn prop_submitting_always_settles(
        question in "[a-z]{1,15}",
        settle in arb_settle_event()
    ) {
        let mut store = SessionStore::new(100);
        let result = transition(
            &ChatState::Idle,
            store.transcript(),
            Event::Submit { query: question },
        )
        .unwrap();
        let state = result.new_state;
        apply(&mut store, result.effects);

        let result = transition(&state, store.transcript(), settle).unwrap();
        let settled_state = result.new_state.clone();
        apply(&mut store, result.effects);

        prop_assert!(settled_state.is_accepting());
        prop_assert!(!store.loading());

        let last = store.transcript().last().unwrap();
        prop_assert!(last.role == Role::Assistant);
        prop_assert!(
            !last.content.is_empty() || last.error.is_some(),
            "placeholder left unreconciled: {last:?}"
        );
        prop_assert!(
            !(last.error.is_some() && !last.content.is_empty()),
            "message carries both content and error: {last:?}"
        );
    }

    // Blank submissions never touch the transcript or the network.
    #[test]
    fn prop_blank_submit_only_sets_the_error(padding in "[ \t]{0,8}") {
        let mut store = SessionStore::new(100);
        let result = transition(
            &ChatState::Idle,
            store.transcript(),
            Event::Submit { query: padding },
        )
        .unwrap();

        prop_assert_eq!(result.new_state, ChatState::Idle);
        let request = apply(&mut store, result.effects);
        prop_assert!(request.is_none());
        prop_assert!(store.transcript().is_empty());
        prop_assert!(store.error().is_some());
    }
}
