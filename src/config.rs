//! Environment-variable configuration

use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Upper bound on the request timeout; capping here keeps every client
/// construction uniform.
pub const MAX_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_MAX_MESSAGES: usize = 100;
pub const DEFAULT_LOG_PATH: &str = "flyleaf.log";

/// Widget configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// RAG service base URL
    pub api_url: String,
    /// Request timeout in milliseconds, capped at `MAX_TIMEOUT_MS`
    pub timeout_ms: u64,
    /// Verbose request/response logging
    pub debug: bool,
    /// Transcript capacity bound
    pub max_messages: usize,
    /// Corner the widget anchors to
    pub position: WidgetPosition,
    /// Start with the widget collapsed to its corner bar
    pub start_minimized: bool,
    /// Log file path (the terminal itself belongs to the widget)
    pub log_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            debug: false,
            max_messages: DEFAULT_MAX_MESSAGES,
            position: WidgetPosition::default(),
            start_minimized: false,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("FLYLEAF_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            timeout_ms: std::env::var("FLYLEAF_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_MS)
                .min(MAX_TIMEOUT_MS),
            debug: std::env::var("FLYLEAF_DEBUG")
                .is_ok_and(|v| parse_bool(&v)),
            max_messages: std::env::var("FLYLEAF_MAX_MESSAGES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_MESSAGES),
            position: std::env::var("FLYLEAF_POSITION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            start_minimized: std::env::var("FLYLEAF_MINIMIZED")
                .is_ok_and(|v| parse_bool(&v)),
            log_path: std::env::var("FLYLEAF_LOG")
                .map_or_else(|_| PathBuf::from(DEFAULT_LOG_PATH), PathBuf::from),
        }
    }
}

/// Corner of the host terminal the widget occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetPosition {
    #[default]
    BottomRight,
    BottomLeft,
}

impl FromStr for WidgetPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "bottom-right" => Ok(WidgetPosition::BottomRight),
            "bottom-left" => Ok(WidgetPosition::BottomLeft),
            other => Err(format!("unknown position: {other}")),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
