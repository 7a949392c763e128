//! Budget-aware Markdown rendering of memory for prompt injection.

use crate::store::MemoryStore;
use crate::types::{MemoryEntry, SignalType};

/// Section order for the full context render. Earlier sections win the
/// budget when space runs out.
const CONTEXT_SECTIONS: [(SignalType, &str); 10] = [
    (SignalType::KeyFact, "Key facts"),
    (SignalType::Decision, "Decisions"),
    (SignalType::Error, "Errors"),
    (SignalType::StepPending, "Pending steps"),
    (SignalType::StepDone, "Completed steps"),
    (SignalType::FileModified, "Files modified"),
    (SignalType::JudgeDirective, "Judge directives"),
    (SignalType::EvalFeedback, "Review feedback"),
    (SignalType::PhaseResult, "Phase results"),
    (SignalType::FeedbackResponse, "Feedback responses"),
];

/// Sections for the judge's evaluation context.
const EVAL_SECTIONS: [(SignalType, &str); 3] = [
    (SignalType::JudgeDirective, "Judge directives"),
    (SignalType::EvalFeedback, "Review feedback"),
    (SignalType::PhaseResult, "Phase results"),
];

impl MemoryStore {
    /// Render the full memory of a task as Markdown, grouped by type in
    /// fixed priority order. A section is appended only when it fits the
    /// budget whole; when nothing fits, the result is empty.
    pub async fn build_context(&self, task_id: &str) -> String {
        let entries = self.entries_for_task(task_id).await;
        render_sections(&entries, &CONTEXT_SECTIONS, self.context_budget())
    }

    /// Render prior evaluation memory (directives, feedback, phase
    /// results) for the judge.
    pub async fn build_eval_context(&self, task_id: &str) -> String {
        let entries = self.entries_for_task(task_id).await;
        render_sections(&entries, &EVAL_SECTIONS, self.context_budget())
    }

    /// Render only the EVAL_FEEDBACK entries from the given phase
    /// iteration, line by line while the budget allows.
    pub async fn build_current_iteration_eval_context(
        &self,
        task_id: &str,
        phase_iteration: u32,
    ) -> String {
        let entries = self.entries_for_task(task_id).await;
        let mut out = String::new();
        for entry in entries.iter().filter(|e| {
            e.signal_type == SignalType::EvalFeedback && e.phase_iteration == phase_iteration
        }) {
            let line = format!("- {}\n", entry.content);
            if out.len() + line.len() > self.context_budget() {
                break;
            }
            out.push_str(&line);
        }
        out
    }
}

fn render_sections(
    entries: &[MemoryEntry],
    sections: &[(SignalType, &str)],
    budget: usize,
) -> String {
    let mut out = String::new();
    for (signal_type, title) in sections {
        let matching: Vec<&MemoryEntry> = entries
            .iter()
            .filter(|e| e.signal_type == *signal_type)
            .collect();
        if matching.is_empty() {
            continue;
        }

        let mut section = format!("## {title}\n");
        for entry in matching {
            section.push_str(&format!("- {}\n", entry.content));
        }
        section.push('\n');

        if out.len() + section.len() <= budget {
            out.push_str(&section);
        }
    }
    out
}
