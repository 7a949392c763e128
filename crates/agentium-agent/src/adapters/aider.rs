use crate::adapter::{AgentAdapter, Invocation};
use crate::ndjson::StreamContext;
use crate::result::IterationResult;
use agentium_core::{parse_status, AgentEvent, AgentStatus, EventKind};

/// Adapter for the Aider CLI.
///
/// Aider writes unstructured text, so parsing scans for its well-known
/// line markers (`Applied edit to`, `Commit <hash>`) and the Agentium
/// signal lines.
pub struct AiderAdapter {
    binary: String,
}

impl AiderAdapter {
    pub fn new() -> Self {
        Self {
            binary: "aider".into(),
        }
    }

    /// Override the CLI binary, for tests.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl Default for AiderAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentAdapter for AiderAdapter {
    fn name(&self) -> &str {
        "aider"
    }

    fn container_image(&self) -> &str {
        "ghcr.io/agentium-dev/aider:latest"
    }

    fn build_command(&self, invocation: &Invocation) -> Vec<String> {
        let mut cmd = vec![
            self.binary.clone(),
            "--yes-always".into(),
            "--no-stream".into(),
        ];
        if !invocation.model.is_empty() && invocation.model != "default" {
            cmd.push("--model".into());
            cmd.push(invocation.model.clone());
        }
        cmd.push("--message".into());
        cmd.push(self.build_prompt(invocation));
        cmd
    }

    fn parse_output(
        &self,
        exit_code: i32,
        stdout: &str,
        stderr: &str,
        invocation: &Invocation,
    ) -> IterationResult {
        let ctx = StreamContext {
            session_id: invocation.session_id,
            iteration: invocation.iteration,
            adapter_name: self.name().to_string(),
        };

        let mut events = Vec::new();
        let mut files_changed = Vec::new();

        for line in stdout.lines() {
            if let Some(path) = line.strip_prefix("Applied edit to ") {
                let path = path.trim().to_string();
                events.push(
                    AgentEvent::new(
                        ctx.session_id,
                        ctx.iteration,
                        ctx.adapter_name.clone(),
                        EventKind::FileChange,
                        &path,
                        &path,
                    ),
                );
                files_changed.push(path);
            } else if line.starts_with("Commit ") {
                events.push(AgentEvent::new(
                    ctx.session_id,
                    ctx.iteration,
                    ctx.adapter_name.clone(),
                    EventKind::System,
                    line,
                    line,
                ));
            }
        }

        if !stdout.trim().is_empty() {
            events.push(AgentEvent::new(
                ctx.session_id,
                ctx.iteration,
                ctx.adapter_name.clone(),
                EventKind::Text,
                stdout.lines().next().unwrap_or_default(),
                stdout,
            ));
        }

        let status = parse_status(stdout);
        let error = if exit_code != 0 {
            Some(stderr.lines().take(5).collect::<Vec<&str>>().join("\n"))
        } else {
            None
        };

        IterationResult {
            exit_code,
            success: exit_code == 0,
            files_changed,
            error,
            summary: stdout.lines().last().unwrap_or_default().to_string(),
            pushed_changes: status
                .as_ref()
                .map(|s| s.status == AgentStatus::Pushed)
                .filter(|pushed| *pushed),
            agent_status: status.as_ref().map(|s| s.status),
            status_message: status.and_then(|s| s.message),
            tokens_used: None,
            events,
            raw_text: stdout.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::invocation;
    use agentium_core::{Phase, Role};

    #[test]
    fn command_uses_message_mode() {
        let adapter = AiderAdapter::new();
        let cmd = adapter.build_command(&invocation(Phase::Plan, Role::Worker, 1));
        assert_eq!(cmd[0], "aider");
        assert!(cmd.contains(&"--message".to_string()));
        assert!(cmd.contains(&"--yes-always".to_string()));
    }

    #[test]
    fn parse_extracts_edits_and_status() {
        let adapter = AiderAdapter::new();
        let inv = invocation(Phase::Implement, Role::Worker, 1);
        let stdout = "Applied edit to src/main.py\nCommit abc1234 fix the bug\nAGENTIUM_STATUS: TESTS_PASSED\n";
        let result = adapter.parse_output(0, stdout, "", &inv);
        assert!(result.success);
        assert_eq!(result.files_changed, vec!["src/main.py"]);
        assert_eq!(result.agent_status, Some(AgentStatus::TestsPassed));
        assert!(result
            .events
            .iter()
            .any(|e| e.kind == EventKind::FileChange));
    }

    #[test]
    fn nonzero_exit_carries_stderr() {
        let adapter = AiderAdapter::new();
        let inv = invocation(Phase::Plan, Role::Worker, 1);
        let result = adapter.parse_output(2, "", "git not found", &inv);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("git not found"));
    }
}
