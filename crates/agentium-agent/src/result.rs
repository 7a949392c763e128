use agentium_core::{AgentEvent, AgentStatus};
use serde::{Deserialize, Serialize};

/// Token usage reported by an agent CLI, when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Normalized result of one agent invocation.
///
/// Every adapter reduces its native output to this shape; the controller
/// never sees adapter-specific formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationResult {
    pub exit_code: i32,
    pub success: bool,
    #[serde(default)]
    pub files_changed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_changes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_status: Option<AgentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenUsage>,
    #[serde(default)]
    pub events: Vec<AgentEvent>,
    pub raw_text: String,
}

impl IterationResult {
    /// A result for a run that produced no parseable output.
    pub fn bare(exit_code: i32, raw_text: impl Into<String>) -> Self {
        Self {
            exit_code,
            success: exit_code == 0,
            files_changed: Vec::new(),
            error: None,
            summary: String::new(),
            pushed_changes: None,
            agent_status: None,
            status_message: None,
            tokens_used: None,
            events: Vec::new(),
            raw_text: raw_text.into(),
        }
    }
}
