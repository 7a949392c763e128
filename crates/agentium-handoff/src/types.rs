use agentium_core::Phase;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// The GitHub issue a task resolves. Seeded into the store before PLAN runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueContext {
    pub number: u64,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Declared complexity of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Complexity {
    Simple,
    Complex,
}

/// One ordered step of an implementation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationStep {
    pub order: u32,
    pub description: String,
}

/// Structured output of the PLAN phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOutput {
    pub summary: String,
    #[serde(default)]
    pub files_to_modify: BTreeSet<String>,
    #[serde(default)]
    pub files_to_create: BTreeSet<String>,
    pub implementation_steps: Vec<ImplementationStep>,
    pub testing_approach: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub complexity: Option<Complexity>,
}

/// One commit recorded by the IMPLEMENT phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub message: String,
}

/// Structured output of the IMPLEMENT phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementOutput {
    pub branch_name: String,
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub files_changed: BTreeSet<String>,
    pub tests_passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_pr_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_pr_url: Option<String>,
}

/// Structured output of the DOCS phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsOutput {
    #[serde(default)]
    pub docs_updated: BTreeSet<String>,
    pub readme_changed: bool,
}

/// Structured output of the VERIFY phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutput {
    pub checks_passed: bool,
    pub merge_successful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_sha: Option<String>,
    #[serde(default)]
    pub resolved_failures: Vec<String>,
    #[serde(default)]
    pub remaining_failures: Vec<String>,
}

/// Optional structured output of a reviewer run.
///
/// Not persisted in the hand-off store; the driver consumes it directly to
/// decide whether to regress the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutput {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub regression_needed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression_target: Option<Phase>,
}

/// Per-task record: one optional typed output per phase plus the issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<IssueContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implement: Option<ImplementOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<DocsOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<VerifyOutput>,
}

impl TaskRecord {
    /// Whether the record holds an output for the given phase.
    pub fn has_phase_output(&self, phase: Phase) -> bool {
        match phase {
            Phase::Plan => self.plan.is_some(),
            Phase::Implement => self.implement.is_some(),
            Phase::Docs => self.docs.is_some(),
            Phase::Verify => self.verify.is_some(),
        }
    }

    /// Erase the output for a single phase.
    pub fn clear_phase(&mut self, phase: Phase) {
        match phase {
            Phase::Plan => self.plan = None,
            Phase::Implement => self.implement = None,
            Phase::Docs => self.docs = None,
            Phase::Verify => self.verify = None,
        }
    }
}

/// Agents sometimes emit `"complexity": ""` for an unset tag; map it to
/// `None` instead of a parse failure.
fn empty_as_none<'de, D>(de: D) -> Result<Option<Complexity>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some("SIMPLE") => Ok(Some(Complexity::Simple)),
        Some("COMPLEX") => Ok(Some(Complexity::Complex)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid complexity: {other}"
        ))),
    }
}
