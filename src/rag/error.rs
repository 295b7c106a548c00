//! Transport error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// RAG client error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RagError {
    pub kind: RagErrorKind,
    pub message: String,
}

impl RagError {
    pub fn new(kind: RagErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RagErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(RagErrorKind::Timeout, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(RagErrorKind::Server, message)
    }

    #[allow(dead_code)] // Constructor for API completeness
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(RagErrorKind::Validation, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(RagErrorKind::Unknown, message)
    }
}

/// Error classification for the retry affordance and UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RagErrorKind {
    /// No response reached the client - retryable
    #[serde(rename = "NETWORK_ERROR")]
    Network,
    /// Client-side deadline exceeded, request aborted - retryable
    #[serde(rename = "TIMEOUT")]
    Timeout,
    /// Non-2xx status from the service - retryable
    #[serde(rename = "SERVER_ERROR")]
    Server,
    /// Rejected before any network call (empty query) - not retryable
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    /// Successful response without grounding sources - retryable
    #[serde(rename = "NO_CONTEXT")]
    NoContext,
    /// Unclassified failure
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl RagErrorKind {
    /// Canonical wire/UI code for this kind
    pub fn code(self) -> &'static str {
        match self {
            RagErrorKind::Network => "NETWORK_ERROR",
            RagErrorKind::Timeout => "TIMEOUT",
            RagErrorKind::Server => "SERVER_ERROR",
            RagErrorKind::Validation => "VALIDATION_ERROR",
            RagErrorKind::NoContext => "NO_CONTEXT",
            RagErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Parse a structured error body's code field
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NETWORK_ERROR" => Some(RagErrorKind::Network),
            "TIMEOUT" => Some(RagErrorKind::Timeout),
            "SERVER_ERROR" => Some(RagErrorKind::Server),
            "VALIDATION_ERROR" => Some(RagErrorKind::Validation),
            "NO_CONTEXT" => Some(RagErrorKind::NoContext),
            "UNKNOWN" => Some(RagErrorKind::Unknown),
            _ => None,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            RagErrorKind::Network
                | RagErrorKind::Timeout
                | RagErrorKind::Server
                | RagErrorKind::NoContext
        )
    }
}
