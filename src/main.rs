//! flyleaf - conversational search over book content
//!
//! A terminal chat widget backed by a retrieval-augmented query service.
//! Answers are grounded in retrieved book passages; a response without
//! sources is surfaced as a failure rather than shown as an answer.

mod config;
mod orchestrator;
mod rag;
mod session;
mod state_machine;
mod widget;

use config::Config;
use orchestrator::Orchestrator;
use rag::{HttpRagClient, LoggingClient, RagClient};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    // The terminal belongs to the widget, so logs go to a file
    let log_file = open_log_file(&config.log_path)?;
    let default_filter = if config.debug {
        "flyleaf=debug"
    } else {
        "flyleaf=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .init();

    tracing::info!(
        api_url = %config.api_url,
        timeout_ms = config.timeout_ms,
        max_messages = config.max_messages,
        "Starting flyleaf"
    );

    let http = Arc::new(HttpRagClient::new(&config.api_url, config.timeout_ms));
    let client: Arc<dyn RagClient> = Arc::new(LoggingClient::new(http, config.debug));

    if !client.health_check().await {
        tracing::warn!(
            api_url = %config.api_url,
            "Query service is not reachable. Submissions will fail until it comes up."
        );
    }

    let orchestrator = Orchestrator::new(client, config.max_messages);
    widget::run(orchestrator, &config).await?;

    tracing::info!("Shutting down");
    Ok(())
}

/// Open the log file in append mode, creating parent directories as needed.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}
