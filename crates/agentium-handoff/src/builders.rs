//! Phase-input builders.
//!
//! Pure functions that compose the Markdown (and JSON) context blocks a
//! worker receives for each phase, from the typed outputs of the phases
//! before it.

use crate::types::{ImplementOutput, IssueContext, PlanOutput};
use serde_json::json;

/// Cap on the test output excerpt included in DOCS/VERIFY inputs.
pub const TEST_OUTPUT_CAP: usize = 1000;

/// Hint about work that already exists for the task (branch, open PR).
#[derive(Debug, Clone)]
pub struct ExistingWork {
    pub branch: String,
    pub pr_url: Option<String>,
}

/// Compose the PLAN phase input: the raw issue.
pub fn build_plan_input(issue: &IssueContext) -> String {
    format!(
        "## Issue #{}: {}\n\n{}\n",
        issue.number, issue.title, issue.body
    )
}

/// Compose the IMPLEMENT phase input: issue summary plus the full plan and
/// an optional hint about existing work.
pub fn build_implement_input(
    issue: &IssueContext,
    plan: &PlanOutput,
    existing: Option<&ExistingWork>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("## Issue #{}: {}\n\n", issue.number, issue.title));

    out.push_str("## Plan\n\n");
    out.push_str(&format!("{}\n", plan.summary));

    if !plan.files_to_modify.is_empty() {
        out.push_str("\n### Files to modify\n");
        for f in &plan.files_to_modify {
            out.push_str(&format!("- {f}\n"));
        }
    }
    if !plan.files_to_create.is_empty() {
        out.push_str("\n### Files to create\n");
        for f in &plan.files_to_create {
            out.push_str(&format!("- {f}\n"));
        }
    }

    out.push_str("\n### Steps\n");
    for step in &plan.implementation_steps {
        out.push_str(&format!("{}. {}\n", step.order, step.description));
    }

    out.push_str(&format!("\n### Testing approach\n{}\n", plan.testing_approach));

    if let Some(work) = existing {
        out.push_str(&format!("\n### Existing work\nBranch: {}\n", work.branch));
        if let Some(url) = &work.pr_url {
            out.push_str(&format!("Open PR: {url}\n"));
        }
    }

    out
}

/// Compose the DOCS phase input: issue + plan summary + implement summary.
pub fn build_docs_input(
    issue: &IssueContext,
    plan: &PlanOutput,
    implement: &ImplementOutput,
) -> String {
    build_downstream_input(issue, plan, implement)
}

/// Compose the VERIFY phase input: issue + plan summary + implement summary.
pub fn build_verify_input(
    issue: &IssueContext,
    plan: &PlanOutput,
    implement: &ImplementOutput,
) -> String {
    build_downstream_input(issue, plan, implement)
}

fn build_downstream_input(
    issue: &IssueContext,
    plan: &PlanOutput,
    implement: &ImplementOutput,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("## Issue #{}: {}\n\n", issue.number, issue.title));
    out.push_str(&format!("## Plan summary\n{}\n", plan.summary));

    out.push_str("\n## Implementation\n");
    out.push_str(&format!("Branch: {}\n", implement.branch_name));

    if !implement.files_changed.is_empty() {
        out.push_str("\n### Files changed\n");
        for f in &implement.files_changed {
            out.push_str(&format!("- {f}\n"));
        }
    }
    if !implement.commits.is_empty() {
        out.push_str("\n### Commits\n");
        for c in &implement.commits {
            out.push_str(&format!("- {} {}\n", c.hash, c.message));
        }
    }

    out.push_str(&format!(
        "\nTests passed: {}\n",
        if implement.tests_passed { "yes" } else { "no" }
    ));
    if let Some(test_output) = &implement.test_output {
        out.push_str(&format!(
            "\n### Test output\n```\n{}\n```\n",
            truncate_test_output(test_output)
        ));
    }
    if let Some(pr) = implement.draft_pr_number {
        out.push_str(&format!("\nDraft PR: #{pr}"));
        if let Some(url) = &implement.draft_pr_url {
            out.push_str(&format!(" ({url})"));
        }
        out.push('\n');
    }

    out
}

/// JSON variant of the PLAN input, for structured injection.
pub fn build_plan_input_json(issue: &IssueContext) -> serde_json::Value {
    json!({ "issue": issue })
}

/// JSON variant of the IMPLEMENT input.
pub fn build_implement_input_json(
    issue: &IssueContext,
    plan: &PlanOutput,
    existing: Option<&ExistingWork>,
) -> serde_json::Value {
    json!({
        "issue": issue,
        "plan": plan,
        "existing_work": existing.map(|w| json!({
            "branch": w.branch,
            "pr_url": w.pr_url,
        })),
    })
}

/// JSON variant of the DOCS/VERIFY input.
pub fn build_downstream_input_json(
    issue: &IssueContext,
    plan: &PlanOutput,
    implement: &ImplementOutput,
) -> serde_json::Value {
    let mut implement = implement.clone();
    if let Some(test_output) = implement.test_output.take() {
        implement.test_output = Some(truncate_test_output(&test_output).to_string());
    }
    json!({
        "issue": issue,
        "plan_summary": plan.summary,
        "implementation": implement,
    })
}

/// Truncate a test-output excerpt to [`TEST_OUTPUT_CAP`] characters.
fn truncate_test_output(s: &str) -> &str {
    match s.char_indices().nth(TEST_OUTPUT_CAP) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Commit, ImplementationStep};
    use std::collections::BTreeSet;

    fn issue() -> IssueContext {
        IssueContext {
            number: 42,
            title: "Add X".into(),
            body: "Implement X".into(),
            url: None,
        }
    }

    fn plan() -> PlanOutput {
        PlanOutput {
            summary: "Add X".into(),
            files_to_modify: BTreeSet::new(),
            files_to_create: ["x.go".to_string()].into(),
            implementation_steps: vec![ImplementationStep {
                order: 1,
                description: "Create x.go".into(),
            }],
            testing_approach: "unit tests".into(),
            complexity: None,
        }
    }

    fn implement() -> ImplementOutput {
        ImplementOutput {
            branch_name: "feat/issue-42-add-x".into(),
            commits: vec![Commit {
                hash: "abc1234".into(),
                message: "Add X".into(),
            }],
            files_changed: ["x.go".to_string()].into(),
            tests_passed: true,
            test_output: Some("ok".into()),
            draft_pr_number: Some(7),
            draft_pr_url: None,
        }
    }

    #[test]
    fn plan_input_carries_the_issue() {
        let input = build_plan_input(&issue());
        assert!(input.contains("Issue #42: Add X"));
        assert!(input.contains("Implement X"));
    }

    #[test]
    fn implement_input_carries_full_plan() {
        let input = build_implement_input(&issue(), &plan(), None);
        assert!(input.contains("1. Create x.go"));
        assert!(input.contains("Files to create"));
        assert!(input.contains("unit tests"));
        assert!(!input.contains("Existing work"));
    }

    #[test]
    fn implement_input_mentions_existing_work() {
        let work = ExistingWork {
            branch: "feat/old".into(),
            pr_url: Some("https://example.com/pr/3".into()),
        };
        let input = build_implement_input(&issue(), &plan(), Some(&work));
        assert!(input.contains("Branch: feat/old"));
        assert!(input.contains("https://example.com/pr/3"));
    }

    #[test]
    fn downstream_input_summarizes_implementation() {
        let input = build_verify_input(&issue(), &plan(), &implement());
        assert!(input.contains("Branch: feat/issue-42-add-x"));
        assert!(input.contains("abc1234 Add X"));
        assert!(input.contains("Tests passed: yes"));
        assert!(input.contains("Draft PR: #7"));
    }

    #[test]
    fn test_output_is_capped() {
        let mut imp = implement();
        imp.test_output = Some("x".repeat(5000));
        let input = build_docs_input(&issue(), &plan(), &imp);
        let excerpt = input.split("```").nth(1).unwrap();
        assert!(excerpt.trim().len() <= TEST_OUTPUT_CAP);
    }

    #[test]
    fn json_variants_are_structured() {
        let v = build_implement_input_json(&issue(), &plan(), None);
        assert_eq!(v["issue"]["number"], 42);
        assert_eq!(v["plan"]["summary"], "Add X");

        let v = build_downstream_input_json(&issue(), &plan(), &implement());
        assert_eq!(v["implementation"]["branch_name"], "feat/issue-42-add-x");
    }

    #[test]
    fn json_downstream_caps_test_output() {
        let mut imp = implement();
        imp.test_output = Some("y".repeat(5000));
        let v = build_downstream_input_json(&issue(), &plan(), &imp);
        let excerpt = v["implementation"]["test_output"].as_str().unwrap();
        assert_eq!(excerpt.len(), TEST_OUTPUT_CAP);
    }
}
