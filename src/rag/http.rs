//! HTTP client for the remote RAG service

use super::{QueryRequest, RagClient, RagError, RagErrorKind, ResponsePayload, SourceRef};
use crate::config::MAX_TIMEOUT_MS;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// RAG service client over HTTP
///
/// Stateless apart from configuration fixed at construction; one instance
/// is shared for the lifetime of the widget. The timeout is carried by the
/// underlying client so expiry aborts the in-flight request rather than
/// racing a local countdown.
pub struct HttpRagClient {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpRagClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        let timeout_ms = timeout_ms.min(MAX_TIMEOUT_MS);
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms,
        }
    }

    fn translate_send_error(&self, e: &reqwest::Error) -> RagError {
        if e.is_timeout() {
            RagError::timeout(format!("Request timeout after {}ms", self.timeout_ms))
        } else if e.is_connect() {
            RagError::network(format!("Connection failed: {e}"))
        } else {
            RagError::unknown(format!("Request failed: {e}"))
        }
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> RagError {
        // Structured error bodies carry {"error": {"code", "message"}}
        if let Ok(parsed) = serde_json::from_str::<WireErrorBody>(body) {
            let kind = parsed
                .error
                .code
                .as_deref()
                .and_then(RagErrorKind::from_code)
                .unwrap_or(RagErrorKind::Server);
            return RagError::new(kind, parsed.error.message);
        }
        RagError::server(format!("API error: {status}"))
    }

    fn normalize_response(resp: WireQueryResponse) -> ResponsePayload {
        ResponsePayload {
            answer: resp.answer,
            sources: resp
                .sources
                .into_iter()
                .map(|s| SourceRef {
                    url: s.url,
                    label: s.section,
                    relevance: s.score,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl RagClient for HttpRagClient {
    async fn submit_query(&self, request: &QueryRequest) -> Result<ResponsePayload, RagError> {
        // The server contract is strict about the accepted fields; top_k and
        // include_context are client-side knobs and never hit the wire.
        let wire_request = WireQueryRequest {
            question: &request.question,
            context: None,
            conversation_id: None,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/query", self.base_url))
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| self.translate_send_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                RagError::timeout(format!("Request timeout after {}ms", self.timeout_ms))
            } else {
                RagError::network(format!("Failed to read response: {e}"))
            }
        })?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }

        let wire_response: WireQueryResponse = serde_json::from_str(&body)
            .map_err(|e| RagError::unknown(format!("Failed to parse response: {e}")))?;

        Ok(Self::normalize_response(wire_response))
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/v1/health", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

// Wire types - private to this file so field-name drift never leaks out

#[derive(Debug, Serialize)]
struct WireQueryRequest<'a> {
    question: &'a str,
    context: Option<&'a str>,
    conversation_id: Option<&'a str>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct WireQueryResponse {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    sources: Vec<WireSource>,
}

#[derive(Debug, Deserialize)]
struct WireSource {
    #[serde(default)]
    url: String,
    #[serde(default)]
    section: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}
