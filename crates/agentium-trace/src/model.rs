use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque handle to a task trace. Holds IDs and names only; the tracer
/// owns the actual nodes.
#[derive(Debug, Clone)]
pub struct TraceCtx {
    pub trace_id: Uuid,
    pub task_id: String,
}

/// Opaque handle to a phase span within a trace.
#[derive(Debug, Clone)]
pub struct SpanCtx {
    pub trace_id: Uuid,
    pub span_id: Uuid,
    pub phase_name: String,
}

/// Which of the three per-iteration LLM calls a generation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationName {
    Worker,
    Reviewer,
    Judge,
}

impl fmt::Display for GenerationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationName::Worker => "Worker",
            GenerationName::Reviewer => "Reviewer",
            GenerationName::Judge => "Judge",
        };
        write!(f, "{s}")
    }
}

/// Terminal status of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Completed,
    Error,
}

/// One recorded LLM invocation.
#[derive(Debug, Clone)]
pub struct GenerationInput {
    pub name: GenerationName,
    pub model: String,
    pub input: String,
    pub output: String,
    /// Omitted from exported metadata when empty.
    pub system_prompt: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub status: GenerationStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Closing details for a phase span.
#[derive(Debug, Clone, Default)]
pub struct PhaseEnd {
    pub status: String,
    pub duration_ms: u64,
    pub input: Option<String>,
    pub output: Option<String>,
}

/// Closing details for a task trace.
#[derive(Debug, Clone, Default)]
pub struct TraceEnd {
    pub status: String,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}
