//! Subprocess launcher for agent CLIs.

use crate::adapter::{AgentAdapter, Invocation};
use crate::result::IterationResult;
use agentium_core::{AgentiumError, AgentiumResult};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Launch the adapter's CLI for one invocation and parse its output.
///
/// Blocks until the process exits or the cancellation token fires; on
/// cancel the child is killed and [`AgentiumError::Cancelled`] is
/// returned.
pub async fn run_agent(
    adapter: &dyn AgentAdapter,
    invocation: &Invocation,
    cancel: &CancellationToken,
) -> AgentiumResult<IterationResult> {
    adapter.validate()?;

    let command = adapter.build_command(invocation);
    let (program, args) = command
        .split_first()
        .ok_or_else(|| AgentiumError::Adapter(format!("{}: empty command", adapter.name())))?;

    info!(
        adapter = adapter.name(),
        phase = %invocation.phase,
        role = %invocation.role,
        iteration = invocation.iteration,
        program = %program,
        "Launching agent CLI"
    );

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .envs(adapter.build_env(invocation))
        .current_dir(&invocation.work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        AgentiumError::Adapter(format!(
            "Failed to spawn {} ({program}): {e}",
            adapter.name()
        ))
    })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| AgentiumError::Adapter("child stdout not captured".into()))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| AgentiumError::Adapter("child stderr not captured".into()))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf).await;
        buf
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut buf).await;
        buf
    });

    let status = tokio::select! {
        status = child.wait() => status.map_err(|e| {
            AgentiumError::Adapter(format!("{}: wait failed: {e}", adapter.name()))
        })?,
        _ = cancel.cancelled() => {
            warn!(adapter = adapter.name(), "Cancellation requested, killing agent process");
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(AgentiumError::Cancelled);
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    let stdout = String::from_utf8_lossy(&stdout);
    let stderr = String::from_utf8_lossy(&stderr);

    let exit_code = status.code().unwrap_or(-1);
    info!(
        adapter = adapter.name(),
        exit_code,
        stdout_bytes = stdout.len(),
        "Agent CLI exited"
    );

    Ok(adapter.parse_output(exit_code, &stdout, &stderr, invocation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::invocation;
    use agentium_core::{Phase, Role};
    use std::collections::HashMap;

    struct ShellAdapter {
        script: String,
    }

    impl AgentAdapter for ShellAdapter {
        fn name(&self) -> &str {
            "shell"
        }
        fn container_image(&self) -> &str {
            "none"
        }
        fn build_env(&self, _invocation: &Invocation) -> HashMap<String, String> {
            HashMap::new()
        }
        fn build_command(&self, _invocation: &Invocation) -> Vec<String> {
            vec!["sh".into(), "-c".into(), self.script.clone()]
        }
        fn parse_output(
            &self,
            exit_code: i32,
            stdout: &str,
            _stderr: &str,
            _invocation: &Invocation,
        ) -> IterationResult {
            IterationResult::bare(exit_code, stdout)
        }
    }

    fn tmp_invocation(dir: &std::path::Path) -> crate::adapter::Invocation {
        let mut inv = invocation(Phase::Plan, Role::Worker, 1);
        inv.work_dir = dir.to_path_buf();
        inv
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let adapter = ShellAdapter {
            script: "echo hello; exit 0".into(),
        };
        let result = run_agent(&adapter, &tmp_invocation(tmp.path()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(result.success);
        assert_eq!(result.raw_text.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let adapter = ShellAdapter {
            script: "exit 3".into(),
        };
        let result = run_agent(&adapter, &tmp_invocation(tmp.path()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 3);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn missing_binary_is_adapter_error() {
        struct Missing;
        impl AgentAdapter for Missing {
            fn name(&self) -> &str {
                "missing"
            }
            fn container_image(&self) -> &str {
                "none"
            }
            fn build_command(&self, _invocation: &Invocation) -> Vec<String> {
                vec!["definitely-not-a-real-binary-xyz".into()]
            }
            fn parse_output(
                &self,
                exit_code: i32,
                stdout: &str,
                _stderr: &str,
                _invocation: &Invocation,
            ) -> IterationResult {
                IterationResult::bare(exit_code, stdout)
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let err = run_agent(&Missing, &tmp_invocation(tmp.path()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentiumError::Adapter(_)));
    }

    #[tokio::test]
    async fn cancellation_kills_the_child() {
        let tmp = tempfile::tempdir().unwrap();
        let adapter = ShellAdapter {
            script: "sleep 30".into(),
        };
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            cancel_clone.cancel();
        });

        let inv = tmp_invocation(tmp.path());
        let start = std::time::Instant::now();
        let err = run_agent(&adapter, &inv, &cancel).await.unwrap_err();
        assert!(matches!(err, AgentiumError::Cancelled));
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
    }
}
