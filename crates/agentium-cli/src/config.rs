//! Session configuration discovery.
//!
//! Precedence: inline JSON in `AGENTIUM_SESSION_CONFIG`, then the file
//! named by `AGENTIUM_CONFIG_PATH`, then `/etc/agentium/session.json`.
//! A session without configuration is fatal.

use agentium_controller::SessionConfig;
use agentium_core::{AgentiumError, AgentiumResult};
use std::path::Path;

pub const ENV_INLINE_CONFIG: &str = "AGENTIUM_SESSION_CONFIG";
pub const ENV_CONFIG_PATH: &str = "AGENTIUM_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/agentium/session.json";

/// Load the session config from the environment.
pub fn load_session_config() -> AgentiumResult<SessionConfig> {
    if let Ok(inline) = std::env::var(ENV_INLINE_CONFIG) {
        return SessionConfig::from_json(&inline);
    }

    let path = std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from_file(Path::new(&path))
}

fn load_from_file(path: &Path) -> AgentiumResult<SessionConfig> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        AgentiumError::Config(format!(
            "no session config: cannot read {}: {e}",
            path.display()
        ))
    })?;
    SessionConfig::from_json(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_json() -> String {
        serde_json::json!({
            "repository": "octo/repo",
            "issues": [42],
            "work_dir": "/tmp/work",
            "routing": {"default": {"adapter": "claude-code", "model": "m"}}
        })
        .to_string()
    }

    #[test]
    fn file_config_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, config_json()).unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.repository, "octo/repo");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = load_from_file(Path::new("/nonexistent/session.json")).unwrap_err();
        assert!(matches!(err, AgentiumError::Config(_)));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "{broken").unwrap();
        assert!(load_from_file(&path).is_err());
    }
}
