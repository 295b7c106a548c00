//! Events that drive the query lifecycle

use crate::rag::{RagError, ResponsePayload};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// User submitted a question
    Submit { query: String },

    /// The in-flight request resolved
    Completed(ResponsePayload),

    /// The in-flight request rejected
    Failed(RagError),

    /// User asked to replay the last failed exchange
    Retry,
}
