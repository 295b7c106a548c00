//! RAG service client abstraction
//!
//! Provides a common interface for submitting questions to the remote
//! retrieval-augmented-generation endpoint.

mod error;
mod http;
mod types;

#[cfg(test)]
pub mod testing;

pub use error::{RagError, RagErrorKind};
pub use http::HttpRagClient;
pub use types::{QueryRequest, ResponsePayload, SourceRef};

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for RAG service clients
#[async_trait]
pub trait RagClient: Send + Sync {
    /// Submit one question and await the answer with its sources.
    ///
    /// Never retries internally; retry is an explicit orchestrator
    /// operation driven by the user.
    async fn submit_query(&self, request: &QueryRequest) -> Result<ResponsePayload, RagError>;

    /// Best-effort health probe. Any failure maps to `false`, never errors.
    async fn health_check(&self) -> bool;
}

/// Logging wrapper for RAG clients
///
/// `verbose` additionally logs request and response bodies at debug level.
pub struct LoggingClient {
    inner: Arc<dyn RagClient>,
    verbose: bool,
}

impl LoggingClient {
    pub fn new(inner: Arc<dyn RagClient>, verbose: bool) -> Self {
        Self { inner, verbose }
    }
}

#[async_trait]
impl RagClient for LoggingClient {
    async fn submit_query(&self, request: &QueryRequest) -> Result<ResponsePayload, RagError> {
        if self.verbose {
            tracing::debug!(question = %request.question, top_k = request.top_k, "Submitting query");
        }

        let start = std::time::Instant::now();
        let result = self.inner.submit_query(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    question_len = request.question.len(),
                    answer_len = response.answer.len(),
                    source_count = response.sources.len(),
                    duration_ms = %duration.as_millis(),
                    "Query completed"
                );
                if self.verbose {
                    tracing::debug!(answer = %response.answer, "Response body");
                }
            }
            Err(e) => {
                tracing::warn!(
                    code = e.kind.code(),
                    error = %e.message,
                    duration_ms = %duration.as_millis(),
                    retryable = e.kind.is_retryable(),
                    "Query failed"
                );
            }
        }

        result
    }

    async fn health_check(&self) -> bool {
        let healthy = self.inner.health_check().await;
        if self.verbose {
            tracing::debug!(healthy, "Health check");
        }
        healthy
    }
}
