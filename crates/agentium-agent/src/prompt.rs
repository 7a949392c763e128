//! Prompt assembly shared by all adapters.
//!
//! Block order: system prompt, project prompt, repository line, user
//! prompt, phase-relevant skill blocks, iteration banner (when past the
//! first iteration), structured phase input.

use crate::adapter::Invocation;

/// A named skill block selected for the current phase.
#[derive(Debug, Clone)]
pub struct SkillBlock {
    pub name: String,
    pub content: String,
}

/// The pieces a prompt is assembled from.
#[derive(Debug, Clone, Default)]
pub struct PromptParts {
    pub system_prompt: String,
    pub project_prompt: String,
    pub user_prompt: String,
    pub skills: Vec<SkillBlock>,
    pub phase_input: Option<String>,
}

/// Assemble the final prompt text for an invocation.
pub fn assemble_prompt(invocation: &Invocation) -> String {
    let parts = &invocation.prompt;
    let mut out = String::new();

    if !parts.system_prompt.is_empty() {
        out.push_str(&parts.system_prompt);
        out.push_str("\n\n");
    }
    if !parts.project_prompt.is_empty() {
        out.push_str(&parts.project_prompt);
        out.push_str("\n\n");
    }

    out.push_str(&format!("Repository: {}\n\n", invocation.repository));
    out.push_str(&parts.user_prompt);
    out.push('\n');

    for skill in &parts.skills {
        out.push_str(&format!("\n## Skill: {}\n{}\n", skill.name, skill.content));
    }

    if invocation.phase_iteration > 1 {
        out.push_str(&format!(
            "\n---\nThis is iteration {} of the {} phase. Address the feedback below before anything else.\n---\n",
            invocation.phase_iteration, invocation.phase
        ));
    }

    if let Some(input) = &parts.phase_input {
        out.push_str(&format!("\n{input}\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::invocation;
    use agentium_core::{Phase, Role};

    #[test]
    fn blocks_appear_in_contract_order() {
        let mut inv = invocation(Phase::Implement, Role::Worker, 1);
        inv.prompt = PromptParts {
            system_prompt: "SYSTEM".into(),
            project_prompt: "PROJECT".into(),
            user_prompt: "USER".into(),
            skills: vec![SkillBlock {
                name: "git-workflow".into(),
                content: "use feature branches".into(),
            }],
            phase_input: Some("## Plan\nsteps".into()),
        };

        let prompt = assemble_prompt(&inv);
        let system = prompt.find("SYSTEM").unwrap();
        let project = prompt.find("PROJECT").unwrap();
        let repo = prompt.find("Repository: octo/repo").unwrap();
        let user = prompt.find("USER").unwrap();
        let skill = prompt.find("## Skill: git-workflow").unwrap();
        let input = prompt.find("## Plan").unwrap();
        assert!(system < project && project < repo && repo < user);
        assert!(user < skill && skill < input);
    }

    #[test]
    fn iteration_banner_only_after_first() {
        let inv = invocation(Phase::Plan, Role::Worker, 1);
        assert!(!assemble_prompt(&inv).contains("iteration"));

        let mut inv = invocation(Phase::Plan, Role::Worker, 2);
        inv.phase_iteration = 2;
        let prompt = assemble_prompt(&inv);
        assert!(prompt.contains("iteration 2 of the PLAN phase"));
    }

    #[test]
    fn empty_blocks_are_omitted() {
        let inv = invocation(Phase::Plan, Role::Worker, 1);
        let prompt = assemble_prompt(&inv);
        assert!(!prompt.contains("Skill:"));
        assert!(prompt.starts_with("system"));
    }
}
