//! Session store: the single source of truth for the transcript and
//! UI-facing flags. All mutation goes through explicit operations.

use crate::rag::{RagErrorKind, SourceRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    #[allow(dead_code)] // Part of the transcript model, never produced locally
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error carried by a failed assistant message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageError {
    pub code: RagErrorKind,
    pub message: String,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MessageError>,
}

impl Message {
    pub fn is_failed_assistant(&self) -> bool {
        self.role == Role::Assistant && self.error.is_some()
    }
}

/// Partial update merged into the last transcript message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub sources: Option<Vec<SourceRef>>,
    pub error: Option<MessageError>,
    pub refresh_timestamp: bool,
}

impl MessagePatch {
    /// Patch converting a placeholder into a final answer
    pub fn answered(content: impl Into<String>, sources: Vec<SourceRef>) -> Self {
        Self {
            content: Some(content.into()),
            sources: Some(sources),
            error: None,
            refresh_timestamp: true,
        }
    }

    /// Patch marking a placeholder as errored
    pub fn errored(code: RagErrorKind, message: impl Into<String>) -> Self {
        Self {
            content: None,
            sources: None,
            error: Some(MessageError {
                code,
                message: message.into(),
            }),
            refresh_timestamp: false,
        }
    }
}

/// Seam for the host's "current text selection" capability
/// (the browser selection in a web embedding; the system clipboard here).
pub trait SelectionSource {
    fn read_selection(&mut self) -> Result<Option<String>, String>;
}

/// Clipboard-backed selection source, probing the usual paste commands
pub struct ClipboardSelection;

impl SelectionSource for ClipboardSelection {
    fn read_selection(&mut self) -> Result<Option<String>, String> {
        #[cfg(target_os = "macos")]
        {
            run_paste_command("pbpaste", &[])
        }

        #[cfg(target_os = "linux")]
        {
            for (cmd, args) in [
                ("wl-paste", vec!["-n"]),
                ("xclip", vec!["-selection", "clipboard", "-o"]),
                ("xsel", vec!["--clipboard", "--output"]),
            ] {
                if let Some(value) = run_paste_command(cmd, &args)? {
                    return Ok(Some(value));
                }
            }
            Ok(None)
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            Ok(None)
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn run_paste_command(command: &str, args: &[&str]) -> Result<Option<String>, String> {
    let output = match std::process::Command::new(command).args(args).output() {
        Ok(output) => output,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.to_string()),
    };

    if !output.status.success() {
        return Ok(None);
    }

    let content = String::from_utf8_lossy(&output.stdout).replace("\r\n", "\n");
    if content.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(content.trim_end_matches('\n').to_string()))
}

/// In-memory ordered transcript with bounded capacity
///
/// Created empty at widget mount, destroyed at unmount; no persistence.
pub struct SessionStore {
    session_id: String,
    transcript: Vec<Message>,
    max_messages: usize,
    next_id: u64,
    loading: bool,
    error: Option<String>,
    selected_text: Option<String>,
}

impl SessionStore {
    pub fn new(max_messages: usize) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            transcript: Vec::new(),
            max_messages: max_messages.max(1),
            next_id: 1,
            loading: false,
            error: None,
            selected_text: None,
        }
    }

    /// Tracing correlation id for this session
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn selected_text(&self) -> Option<&str> {
        self.selected_text.as_deref()
    }

    /// Append a message, evicting from the front while over capacity.
    ///
    /// Eviction is per-message, not per-pair: dropping the oldest entry may
    /// leave an assistant message without its preceding user message.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        let message = Message {
            id: format!("msg-{}", self.next_id),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            sources: Vec::new(),
            error: None,
        };
        self.next_id += 1;
        self.transcript.push(message);

        while self.transcript.len() > self.max_messages {
            self.transcript.remove(0);
        }
    }

    /// Merge a patch into the final message; no-op on an empty transcript.
    pub fn update_last(&mut self, patch: MessagePatch) {
        let Some(last) = self.transcript.last_mut() else {
            return;
        };
        if let Some(content) = patch.content {
            last.content = content;
        }
        if let Some(sources) = patch.sources {
            last.sources = sources;
        }
        if let Some(error) = patch.error {
            last.error = Some(error);
        }
        if patch.refresh_timestamp {
            last.timestamp = Utc::now();
        }
    }

    /// Pop the final message (retry support)
    pub fn remove_last(&mut self) -> Option<Message> {
        self.transcript.pop()
    }

    /// Empty the transcript; loading and error flags are untouched.
    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    /// Record the host selection; whitespace-only captures normalize to
    /// `None` so "nothing selected" and "selected empty region" read alike.
    pub fn capture_selection(&mut self, source: &mut dyn SelectionSource) -> Option<String> {
        let selected = match source.read_selection() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(session_id = %self.session_id, error = %err, "Selection capture failed");
                None
            }
        };
        let selected = selected.filter(|s| !s.trim().is_empty());
        self.selected_text.clone_from(&selected);
        selected
    }
}
