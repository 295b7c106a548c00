//! Canonical request/response types
//!
//! These are the shapes the rest of the crate sees. All wire-format
//! translation (field-name drift like `section` vs `label`) stays inside
//! `rag/http.rs`.

use serde::{Deserialize, Serialize};

/// Number of chunks requested from the retrieval service per query
pub const DEFAULT_TOP_K: u32 = 5;

/// A query to the RAG service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub top_k: u32,
    pub include_context: bool,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: DEFAULT_TOP_K,
            include_context: true,
        }
    }
}

/// Normalized response from the RAG service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// A retrieved source chunk, in the order ranked by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub url: String,
    pub label: String,
    /// Relevance score in [0, 1]
    pub relevance: f64,
}
