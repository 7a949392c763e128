//! System and project prompt loading.
//!
//! The system prompt ships embedded in the binary; a remote override may
//! be fetched at session start, bounded by a timeout and a 1 MiB cap. Any
//! fetch failure falls back to the embedded copy. The project prompt is
//! read from `<workDir>/.agentium/AGENT.md` when present.

use agentium_core::{AgentiumError, AgentiumResult};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// The embedded system prompt, compiled into the binary.
pub const EMBEDDED_SYSTEM_PROMPT: &str = include_str!("../prompts/SYSTEM.md");

/// Cap on a remotely fetched system prompt, in bytes.
pub const REMOTE_PROMPT_CAP_BYTES: usize = 1024 * 1024;

/// Load the system prompt: try the remote URL when configured, fall back
/// to the embedded copy on any failure.
pub async fn load_system_prompt(remote_url: Option<&str>, timeout: Duration) -> String {
    let Some(url) = remote_url else {
        return EMBEDDED_SYSTEM_PROMPT.to_string();
    };

    match fetch_remote_prompt(url, timeout).await {
        Ok(prompt) => {
            info!(url, bytes = prompt.len(), "Loaded remote system prompt");
            prompt
        }
        Err(e) => {
            warn!(url, error = %e, "Remote system prompt unavailable, using embedded");
            EMBEDDED_SYSTEM_PROMPT.to_string()
        }
    }
}

/// Fetch a prompt over HTTP with a byte cap enforced while streaming.
async fn fetch_remote_prompt(url: &str, timeout: Duration) -> AgentiumResult<String> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AgentiumError::Http(e.to_string()))?;

    let mut resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| AgentiumError::Http(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(AgentiumError::Http(format!(
            "prompt fetch failed: {}",
            resp.status()
        )));
    }

    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = resp
        .chunk()
        .await
        .map_err(|e| AgentiumError::Http(e.to_string()))?
    {
        if buf.len() + chunk.len() > REMOTE_PROMPT_CAP_BYTES {
            return Err(AgentiumError::Http(format!(
                "prompt exceeds {REMOTE_PROMPT_CAP_BYTES} byte cap"
            )));
        }
        buf.extend_from_slice(&chunk);
    }

    String::from_utf8(buf)
        .map_err(|e| AgentiumError::Http(format!("prompt is not valid UTF-8: {e}")))
}

/// Load the project prompt from `<workDir>/.agentium/AGENT.md`. A missing
/// file is not an error.
pub async fn load_project_prompt(work_dir: &Path) -> AgentiumResult<Option<String>> {
    let path = work_dir.join(".agentium").join("AGENT.md");
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AgentiumError::Io(e)),
    }
}
