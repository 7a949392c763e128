use crate::prompt::{assemble_prompt, PromptParts};
use crate::result::IterationResult;
use agentium_core::{AgentiumResult, Phase, Role};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Everything an adapter needs to drive one worker/reviewer/judge run.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub session_id: Uuid,
    /// Global iteration counter across the whole session, 1-indexed.
    pub iteration: u32,
    /// Iteration within the current phase, 1-indexed.
    pub phase_iteration: u32,
    pub phase: Phase,
    pub role: Role,
    pub model: String,
    pub repository: String,
    pub work_dir: PathBuf,
    pub prompt: PromptParts,
    /// Session metadata forwarded into the agent environment. Keys that
    /// look sensitive are filtered before propagation.
    pub metadata: HashMap<String, String>,
}

/// Uniform capability set over heterogeneous coding-assistant CLIs.
///
/// Adapters are stateless factories of environment, command line, prompt
/// text, and output parsing for a specific third-party CLI. The default
/// `build_env` and `build_prompt` implementations cover the shared
/// protocol; adapters override `build_command` and `parse_output` for
/// their native formats.
pub trait AgentAdapter: Send + Sync {
    /// Registry name, e.g. `claude-code`.
    fn name(&self) -> &str;

    /// Container image the runtime should launch this CLI in.
    fn container_image(&self) -> &str;

    /// Environment for the agent process: the `AGENTIUM_*` contract plus
    /// filtered session metadata.
    fn build_env(&self, invocation: &Invocation) -> HashMap<String, String> {
        crate::env::build_base_env(invocation)
    }

    /// Full command line, program first.
    fn build_command(&self, invocation: &Invocation) -> Vec<String>;

    /// The composed prompt text.
    fn build_prompt(&self, invocation: &Invocation) -> String {
        assemble_prompt(invocation)
    }

    /// Transform raw process output into the normalized result.
    fn parse_output(
        &self,
        exit_code: i32,
        stdout: &str,
        stderr: &str,
        invocation: &Invocation,
    ) -> IterationResult;

    /// Check adapter configuration before first use.
    fn validate(&self) -> AgentiumResult<()> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use agentium_core::{Phase, Role};

    pub fn invocation(phase: Phase, role: Role, iteration: u32) -> Invocation {
        Invocation {
            session_id: Uuid::new_v4(),
            iteration,
            phase_iteration: iteration,
            phase,
            role,
            model: "test-model".into(),
            repository: "octo/repo".into(),
            work_dir: PathBuf::from("/tmp/work"),
            prompt: PromptParts {
                system_prompt: "system".into(),
                project_prompt: String::new(),
                user_prompt: "do the thing".into(),
                skills: vec![],
                phase_input: None,
            },
            metadata: HashMap::new(),
        }
    }
}
