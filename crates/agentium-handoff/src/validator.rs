//! Validation of typed phase outputs and phase-entry prerequisites.

use crate::store::HandoffStore;
use crate::types::{DocsOutput, ImplementOutput, PlanOutput, VerifyOutput};
use agentium_core::{AgentiumError, AgentiumResult, Phase};
use std::collections::HashSet;

/// Validate a PLAN output against the hand-off contract.
pub fn validate_plan(plan: &PlanOutput) -> AgentiumResult<()> {
    if plan.summary.trim().is_empty() {
        return Err(AgentiumError::Handoff("plan summary is empty".into()));
    }
    if plan.implementation_steps.is_empty() {
        return Err(AgentiumError::Handoff(
            "plan has no implementation steps".into(),
        ));
    }
    let mut orders = HashSet::new();
    for step in &plan.implementation_steps {
        if step.order == 0 {
            return Err(AgentiumError::Handoff(format!(
                "step order must be positive: {:?}",
                step.description
            )));
        }
        if !orders.insert(step.order) {
            return Err(AgentiumError::Handoff(format!(
                "duplicate step order {}",
                step.order
            )));
        }
        if step.description.trim().is_empty() {
            return Err(AgentiumError::Handoff(format!(
                "step {} has an empty description",
                step.order
            )));
        }
    }
    if plan.testing_approach.trim().is_empty() {
        return Err(AgentiumError::Handoff("testing approach is empty".into()));
    }
    Ok(())
}

/// Validate an IMPLEMENT output against the hand-off contract.
pub fn validate_implement(output: &ImplementOutput) -> AgentiumResult<()> {
    if output.branch_name.trim().is_empty() {
        return Err(AgentiumError::Handoff("branch name is empty".into()));
    }
    if output.files_changed.is_empty() {
        return Err(AgentiumError::Handoff("no files changed".into()));
    }
    for commit in &output.commits {
        if commit.hash.trim().is_empty() || commit.message.trim().is_empty() {
            return Err(AgentiumError::Handoff(format!(
                "commit with empty hash or message: {commit:?}"
            )));
        }
    }
    Ok(())
}

/// Validate a DOCS output. The set may legitimately be empty.
pub fn validate_docs(_output: &DocsOutput) -> AgentiumResult<()> {
    Ok(())
}

/// Validate a VERIFY output. The boolean fields are mandatory at the type
/// level; deserialization already rejects records missing them.
pub fn validate_verify(_output: &VerifyOutput) -> AgentiumResult<()> {
    Ok(())
}

/// Check the prerequisites for entering a phase against the store.
///
/// PLAN needs the issue context; IMPLEMENT needs a plan; DOCS and VERIFY
/// need an implementation (and the plan it references); VERIFY additionally
/// needs a draft PR number on the implement output.
pub async fn validate_phase_input(
    store: &HandoffStore,
    task_id: &str,
    phase: Phase,
) -> AgentiumResult<()> {
    match phase {
        Phase::Plan => {
            if store.issue_context(task_id).await.is_none() {
                return Err(AgentiumError::Handoff(format!(
                    "task {task_id}: PLAN requires an issue context"
                )));
            }
        }
        Phase::Implement => {
            if store.plan_output(task_id).await.is_none() {
                return Err(AgentiumError::Handoff(format!(
                    "task {task_id}: IMPLEMENT requires a plan output"
                )));
            }
        }
        Phase::Docs | Phase::Verify => {
            if store.plan_output(task_id).await.is_none() {
                return Err(AgentiumError::Handoff(format!(
                    "task {task_id}: {phase} requires a plan output"
                )));
            }
            let Some(implement) = store.implement_output(task_id).await else {
                return Err(AgentiumError::Handoff(format!(
                    "task {task_id}: {phase} requires an implement output"
                )));
            };
            if phase == Phase::Verify && implement.draft_pr_number.is_none() {
                return Err(AgentiumError::Handoff(format!(
                    "task {task_id}: VERIFY requires a draft PR number"
                )));
            }
        }
    }
    Ok(())
}
