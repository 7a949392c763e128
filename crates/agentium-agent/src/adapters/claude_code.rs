use crate::adapter::{AgentAdapter, Invocation};
use crate::ndjson::{parse_ndjson, StreamContext};
use crate::result::IterationResult;
use agentium_core::{parse_status, AgentStatus, EventKind};

/// Adapter for the Claude Code CLI.
///
/// Runs `claude` in headless mode with `--output-format stream-json` and
/// parses the NDJSON event stream.
pub struct ClaudeCodeAdapter {
    binary: String,
}

impl ClaudeCodeAdapter {
    pub fn new() -> Self {
        Self {
            binary: "claude".into(),
        }
    }

    /// Override the CLI binary, for tests.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl Default for ClaudeCodeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentAdapter for ClaudeCodeAdapter {
    fn name(&self) -> &str {
        "claude-code"
    }

    fn container_image(&self) -> &str {
        "ghcr.io/agentium-dev/claude-code:latest"
    }

    fn build_command(&self, invocation: &Invocation) -> Vec<String> {
        let mut cmd = vec![
            self.binary.clone(),
            "-p".into(),
            self.build_prompt(invocation),
            "--output-format".into(),
            "stream-json".into(),
            "--verbose".into(),
        ];
        if !invocation.model.is_empty() && invocation.model != "default" {
            cmd.push("--model".into());
            cmd.push(invocation.model.clone());
        }
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
        let parse = parse_ndjson(stdout, &ctx);

        // The agent's plain text: every text block, plus the final result
        // when it differs from the last block. Signals are scanned here.
        let mut text_parts: Vec<&str> = parse
            .events
            .iter()
            .filter(|e| e.kind == EventKind::Text)
            .map(|e| e.content.as_str())
            .collect();
        if let Some(result_text) = parse.result_text.as_deref() {
            if text_parts.last() != Some(&result_text) {
                text_parts.push(result_text);
            }
        }
        let text = text_parts.join("\n");

        let files_changed: Vec<String> = parse
            .events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::ToolUse | EventKind::FileChange))
            .filter_map(|e| e.metadata.get("file_path").and_then(|v| v.as_str()))
            .map(ToString::to_string)
            .collect();

        let status = parse_status(&text);
        let success = exit_code == 0 && !parse.is_error;
        let error = if parse.is_error {
            parse.result_text.clone()
        } else if exit_code != 0 {
            Some(first_lines(stderr, 5))
        } else {
            None
        };

        let summary = parse
            .result_text
            .clone()
            .unwrap_or_else(|| first_lines(&text, 3));

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
            tokens_used: parse.usage,
            events: parse.events,
            raw_text: text,
        }
    }
}

fn first_lines(s: &str, n: usize) -> String {
    s.lines().take(n).collect::<Vec<&str>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::invocation;
    use agentium_core::{Phase, Role};

    #[test]
    fn command_targets_stream_json() {
        let adapter = ClaudeCodeAdapter::new();
        let cmd = adapter.build_command(&invocation(Phase::Plan, Role::Worker, 1));
        assert_eq!(cmd[0], "claude");
        assert!(cmd.contains(&"stream-json".to_string()));
        assert!(cmd.contains(&"test-model".to_string()));
    }

    #[test]
    fn default_model_omitted() {
        let adapter = ClaudeCodeAdapter::new();
        let mut inv = invocation(Phase::Plan, Role::Worker, 1);
        inv.model = "default".into();
        let cmd = adapter.build_command(&inv);
        assert!(!cmd.contains(&"--model".to_string()));
    }

    #[test]
    fn parse_collects_text_files_and_status() {
        let adapter = ClaudeCodeAdapter::new();
        let inv = invocation(Phase::Implement, Role::Worker, 1);
        let stdout = concat!(
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"editing now"}]}}"#,
            "\n",
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"t1","name":"Edit","input":{"file_path":"src/x.rs"}}]}}"#,
            "\n",
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"AGENTIUM_STATUS: PUSHED branch up"}]}}"#,
            "\n",
            r#"{"type":"result","subtype":"success","is_error":false,"result":"done","usage":{"input_tokens":10,"output_tokens":5}}"#,
            "\n",
        );
        let result = adapter.parse_output(0, stdout, "", &inv);
        assert!(result.success);
        assert_eq!(result.files_changed, vec!["src/x.rs"]);
        assert_eq!(result.agent_status, Some(AgentStatus::Pushed));
        assert_eq!(result.pushed_changes, Some(true));
        assert_eq!(result.status_message.as_deref(), Some("branch up"));
        assert_eq!(result.summary, "done");
        assert_eq!(result.tokens_used.unwrap().input_tokens, 10);
        assert!(result.raw_text.contains("editing now"));
    }

    #[test]
    fn error_result_surfaces_message() {
        let adapter = ClaudeCodeAdapter::new();
        let inv = invocation(Phase::Plan, Role::Worker, 1);
        let stdout =
            r#"{"type":"result","subtype":"error","is_error":true,"result":"credit exhausted"}"#;
        let result = adapter.parse_output(0, stdout, "", &inv);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("credit exhausted"));
    }

    #[test]
    fn nonzero_exit_uses_stderr() {
        let adapter = ClaudeCodeAdapter::new();
        let inv = invocation(Phase::Plan, Role::Worker, 1);
        let result = adapter.parse_output(1, "", "segfault\nmore context", &inv);
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
        assert!(result.error.unwrap().contains("segfault"));
    }
}
