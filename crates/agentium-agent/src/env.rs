//! Agent environment construction with sensitive-key filtering.

use crate::adapter::Invocation;
use std::collections::HashMap;

/// Metadata key substrings that must never reach an agent environment.
const SENSITIVE_KEY_MARKERS: [&str; 3] = ["api_key", "secret", "token"];

/// Build the base environment for an agent process: the `AGENTIUM_*`
/// contract variables plus session metadata with sensitive keys removed.
pub fn build_base_env(invocation: &Invocation) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert(
        "AGENTIUM_SESSION_ID".to_string(),
        invocation.session_id.to_string(),
    );
    env.insert(
        "AGENTIUM_ITERATION".to_string(),
        invocation.iteration.to_string(),
    );
    env.insert(
        "AGENTIUM_REPOSITORY".to_string(),
        invocation.repository.clone(),
    );
    env.insert(
        "AGENTIUM_WORKDIR".to_string(),
        invocation.work_dir.display().to_string(),
    );

    for (key, value) in &invocation.metadata {
        if is_sensitive_key(key) {
            continue;
        }
        env.insert(key.clone(), value.clone());
    }

    env
}

/// Whether a metadata key looks like it carries a credential.
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_KEY_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::invocation;
    use agentium_core::{Phase, Role};

    #[test]
    fn base_env_carries_the_contract_variables() {
        let inv = invocation(Phase::Plan, Role::Worker, 3);
        let env = build_base_env(&inv);
        assert_eq!(env["AGENTIUM_ITERATION"], "3");
        assert_eq!(env["AGENTIUM_REPOSITORY"], "octo/repo");
        assert_eq!(env["AGENTIUM_WORKDIR"], "/tmp/work");
        assert!(env.contains_key("AGENTIUM_SESSION_ID"));
    }

    #[test]
    fn sensitive_metadata_is_filtered() {
        let mut inv = invocation(Phase::Plan, Role::Worker, 1);
        inv.metadata
            .insert("GITHUB_TOKEN".into(), "ghp_xxx".into());
        inv.metadata
            .insert("OPENAI_API_KEY".into(), "sk-yyy".into());
        inv.metadata
            .insert("My_Secret_Path".into(), "/vault".into());
        inv.metadata.insert("TEAM_NAME".into(), "platform".into());

        let env = build_base_env(&inv);
        assert!(!env.contains_key("GITHUB_TOKEN"));
        assert!(!env.contains_key("OPENAI_API_KEY"));
        assert!(!env.contains_key("My_Secret_Path"));
        assert_eq!(env["TEAM_NAME"], "platform");
    }

    #[test]
    fn sensitivity_check_is_case_insensitive() {
        assert!(is_sensitive_key("Api_Key"));
        assert!(is_sensitive_key("SESSION_TOKEN"));
        assert!(is_sensitive_key("client_secret"));
        assert!(!is_sensitive_key("repository"));
    }
}
