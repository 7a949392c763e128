use crate::adapter::{AgentAdapter, Invocation};
use crate::cli_events::map_cli_events;
use crate::ndjson::StreamContext;
use crate::result::IterationResult;
use agentium_core::{parse_status, AgentStatus, EventKind};

/// Adapter for the Codex CLI.
///
/// Runs `codex exec --json` and maps its line-delimited CLI events onto
/// the unified event model.
pub struct CodexAdapter {
    binary: String,
}

impl CodexAdapter {
    pub fn new() -> Self {
        Self {
            binary: "codex".into(),
        }
    }

    /// Override the CLI binary, for tests.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl Default for CodexAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentAdapter for CodexAdapter {
    fn name(&self) -> &str {
        "codex"
    }

    fn container_image(&self) -> &str {
        "ghcr.io/agentium-dev/codex:latest"
    }

    fn build_command(&self, invocation: &Invocation) -> Vec<String> {
        let mut cmd = vec![
            self.binary.clone(),
            "exec".into(),
            "--json".into(),
            "--cd".into(),
            invocation.work_dir.display().to_string(),
        ];
        if !invocation.model.is_empty() && invocation.model != "default" {
            cmd.push("--model".into());
            cmd.push(invocation.model.clone());
        }
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
        let events = map_cli_events(stdout, &ctx);

        let text = events
            .iter()
            .filter(|e| e.kind == EventKind::Text)
            .map(|e| e.content.as_str())
            .collect::<Vec<&str>>()
            .join("\n");

        let files_changed: Vec<String> = events
            .iter()
            .filter(|e| e.kind == EventKind::FileChange)
            .map(|e| e.content.clone())
            .collect();

        let first_error = events
            .iter()
            .find(|e| e.kind == EventKind::Error)
            .map(|e| e.content.clone());

        let status = parse_status(&text);
        let success = exit_code == 0 && first_error.is_none();
        let error = first_error.or_else(|| {
            if exit_code != 0 {
                Some(stderr.lines().take(5).collect::<Vec<&str>>().join("\n"))
            } else {
                None
            }
        });

        let summary = text
            .lines()
            .last()
            .unwrap_or_default()
            .to_string();

        IterationResult {
            exit_code,
            success,
            files_changed,
            error,
            summary,
            pushed_changes: status
                .as_ref()
                .map(|s| s.status == AgentStatus::Pushed)
                .filter(|pushed| *pushed),
            agent_status: status.as_ref().map(|s| s.status),
            status_message: status.and_then(|s| s.message),
            tokens_used: None,
            events,
            raw_text: text,
        }
    }
}
