//! Mock client for testing
//!
//! Enables orchestrator integration tests without real I/O.

use super::{QueryRequest, RagClient, RagError, ResponsePayload};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock RAG client that returns queued results
pub struct MockRagClient {
    responses: Mutex<VecDeque<Result<ResponsePayload, RagError>>>,
    healthy: bool,
    /// Record of all requests made
    pub requests: Mutex<Vec<QueryRequest>>,
}

impl MockRagClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            healthy: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    #[allow(dead_code)]
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: ResponsePayload) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: RagError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockRagClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RagClient for MockRagClient {
    async fn submit_query(&self, request: &QueryRequest) -> Result<ResponsePayload, RagError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RagError::network("No mock response queued")))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}
