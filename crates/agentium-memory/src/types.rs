use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a memory entry, parsed from `AGENTIUM_MEMORY: <TYPE> <content>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    KeyFact,
    Decision,
    StepDone,
    StepPending,
    FileModified,
    Error,
    EvalFeedback,
    JudgeDirective,
    PhaseResult,
    FeedbackResponse,
}

impl SignalType {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "KEY_FACT" => Some(Self::KeyFact),
            "DECISION" => Some(Self::Decision),
            "STEP_DONE" => Some(Self::StepDone),
            "STEP_PENDING" => Some(Self::StepPending),
            "FILE_MODIFIED" => Some(Self::FileModified),
            "ERROR" => Some(Self::Error),
            "EVAL_FEEDBACK" => Some(Self::EvalFeedback),
            "JUDGE_DIRECTIVE" => Some(Self::JudgeDirective),
            "PHASE_RESULT" => Some(Self::PhaseResult),
            "FEEDBACK_RESPONSE" => Some(Self::FeedbackResponse),
            _ => None,
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::KeyFact => "KEY_FACT",
            Self::Decision => "DECISION",
            Self::StepDone => "STEP_DONE",
            Self::StepPending => "STEP_PENDING",
            Self::FileModified => "FILE_MODIFIED",
            Self::Error => "ERROR",
            Self::EvalFeedback => "EVAL_FEEDBACK",
            Self::JudgeDirective => "JUDGE_DIRECTIVE",
            Self::PhaseResult => "PHASE_RESULT",
            Self::FeedbackResponse => "FEEDBACK_RESPONSE",
        };
        write!(f, "{s}")
    }
}

/// One fact remembered across iterations of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub signal_type: SignalType,
    pub content: String,
    pub global_iteration: u32,
    pub phase_iteration: u32,
    pub task_id: String,
    pub timestamp: DateTime<Utc>,
}

impl MemoryEntry {
    /// Build an entry stamped with the current time.
    pub fn new(
        signal_type: SignalType,
        content: impl Into<String>,
        task_id: impl Into<String>,
        global_iteration: u32,
        phase_iteration: u32,
    ) -> Self {
        Self {
            signal_type,
            content: content.into(),
            global_iteration,
            phase_iteration,
            task_id: task_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A signal parsed from agent stdout, not yet attributed to an iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSignal {
    pub signal_type: SignalType,
    pub content: String,
}
