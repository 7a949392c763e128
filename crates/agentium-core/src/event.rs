use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Maximum length of an event summary, in characters.
pub const MAX_SUMMARY_CHARS: usize = 200;

/// Kind of a unified agent event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Text,
    Thinking,
    ToolUse,
    ToolResult,
    Command,
    FileChange,
    Error,
    System,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Text => "text",
            EventKind::Thinking => "thinking",
            EventKind::ToolUse => "tool_use",
            EventKind::ToolResult => "tool_result",
            EventKind::Command => "command",
            EventKind::FileChange => "file_change",
            EventKind::Error => "error",
            EventKind::System => "system",
        };
        write!(f, "{s}")
    }
}

/// One event in the unified stream every adapter normalizes into.
///
/// Adapters translate their native output formats (NDJSON, CLI events,
/// plain text) into this shape so the controller and tracer see a single
/// event model regardless of which agent produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub iteration: u32,
    pub adapter_name: String,
    pub kind: EventKind,
    /// Short preview, clamped to [`MAX_SUMMARY_CHARS`] characters.
    pub summary: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AgentEvent {
    /// Build an event, clamping the summary to the allowed length.
    pub fn new(
        session_id: Uuid,
        iteration: u32,
        adapter_name: impl Into<String>,
        kind: EventKind,
        summary: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id,
            iteration,
            adapter_name: adapter_name.into(),
            kind,
            summary: clamp_summary(&summary.into()),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Events carrying neither content nor summary are dropped from the
    /// unified stream.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.summary.trim().is_empty()
    }
}

fn clamp_summary(s: &str) -> String {
    if s.chars().count() <= MAX_SUMMARY_CHARS {
        s.to_string()
    } else {
        s.chars().take(MAX_SUMMARY_CHARS).collect()
    }
}
