use crate::router::ModelRouter;
use agentium_core::{AgentiumError, AgentiumResult, Phase};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Per-phase iteration budgets and the session wall clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Budgets {
    /// Override of the per-phase iteration caps. Phases not listed use
    /// their defaults (PLAN=2, IMPLEMENT=5, DOCS=2, VERIFY=3).
    #[serde(default)]
    pub max_iterations: HashMap<Phase, u32>,
    /// Wall-clock limit for the whole session, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_wall_clock_secs: Option<u64>,
}

impl Budgets {
    /// Iteration cap for a phase.
    pub fn max_iterations(&self, phase: Phase) -> u32 {
        self.max_iterations
            .get(&phase)
            .copied()
            .unwrap_or_else(|| phase.default_max_iterations())
    }
}

/// Tracer exporter credentials, when tracing is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    pub base_url: String,
    pub public_key: String,
    pub secret_key: String,
}

/// The session configuration, loaded from JSON.
///
/// Sources, in precedence order: the `AGENTIUM_SESSION_CONFIG` environment
/// variable (inline JSON), the file named by `AGENTIUM_CONFIG_PATH`, and
/// finally `/etc/agentium/session.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// `owner/name` of the target repository.
    pub repository: String,
    /// Issue numbers to resolve, one task each.
    pub issues: Vec<u64>,
    /// Checkout of the target repository.
    pub work_dir: PathBuf,
    /// Model/adapter routing for every task without an override.
    pub routing: ModelRouter,
    /// Per-task routing overrides, keyed by task ID.
    #[serde(default)]
    pub task_routing: HashMap<String, ModelRouter>,
    #[serde(default)]
    pub budgets: Budgets,
    /// Per-task budget overrides, keyed by task ID.
    #[serde(default)]
    pub task_budgets: HashMap<String, Budgets>,
    /// Remote override for the system prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_url: Option<String>,
    /// Confine agent edits to this package path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_scope: Option<String>,
    /// Extra environment forwarded to agents (sensitive keys filtered).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
}

impl SessionConfig {
    /// Parse a config document and reject obvious misconfiguration.
    pub fn from_json(json: &str) -> AgentiumResult<Self> {
        let config: SessionConfig = serde_json::from_str(json)
            .map_err(|e| AgentiumError::Config(format!("invalid session config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AgentiumResult<()> {
        if self.repository.split('/').count() != 2 {
            return Err(AgentiumError::Config(format!(
                "repository must be owner/name: {}",
                self.repository
            )));
        }
        if self.issues.is_empty() {
            return Err(AgentiumError::Config("no issues configured".into()));
        }
        for routing in std::iter::once(&self.routing).chain(self.task_routing.values()) {
            let unknown = routing.unknown_phases();
            if !unknown.is_empty() {
                return Err(AgentiumError::Config(format!(
                    "routing overrides name unknown phases: {}",
                    unknown.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Routing for a task: its override when present, else the session
    /// default.
    pub fn routing_for_task(&self, task_id: &str) -> &ModelRouter {
        self.task_routing.get(task_id).unwrap_or(&self.routing)
    }

    /// Budgets for a task: its override when present, else the session
    /// default. The wall-clock budget stays session-wide.
    pub fn budgets_for_task(&self, task_id: &str) -> &Budgets {
        self.task_budgets.get(task_id).unwrap_or(&self.budgets)
    }

    /// Stable task ID for an issue.
    pub fn task_id(issue: u64) -> String {
        format!("issue-{issue}")
    }

    /// Task IDs in configured order.
    pub fn task_ids(&self) -> Vec<String> {
        self.issues.iter().map(|n| Self::task_id(*n)).collect()
    }
}

/// One live session: the config plus everything resolved at startup.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub config: SessionConfig,
    pub system_prompt: String,
    pub project_prompt: Option<String>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        system_prompt: String,
        project_prompt: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            system_prompt,
            project_prompt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> String {
        serde_json::json!({
            "repository": "octo/repo",
            "issues": [42],
            "work_dir": "/tmp/work",
            "routing": {
                "default": {"adapter": "claude-code", "model": "test-model"}
            }
        })
        .to_string()
    }

    #[test]
    fn minimal_config_parses() {
        let config = SessionConfig::from_json(&minimal_json()).unwrap();
        assert_eq!(config.repository, "octo/repo");
        assert_eq!(config.task_ids(), vec!["issue-42"]);
        assert_eq!(config.budgets.max_iterations(Phase::Implement), 5);
    }

    #[test]
    fn budgets_override_defaults() {
        let json = serde_json::json!({
            "repository": "octo/repo",
            "issues": [1],
            "work_dir": "/tmp/work",
            "routing": {"default": {"adapter": "codex", "model": "m"}},
            "budgets": {"max_iterations": {"IMPLEMENT": 2}}
        })
        .to_string();
        let config = SessionConfig::from_json(&json).unwrap();
        assert_eq!(config.budgets.max_iterations(Phase::Implement), 2);
        assert_eq!(config.budgets.max_iterations(Phase::Plan), 2);
        assert_eq!(config.budgets.max_iterations(Phase::Verify), 3);
    }

    #[test]
    fn bad_repository_rejected() {
        let json = minimal_json().replace("octo/repo", "not-a-repo");
        assert!(SessionConfig::from_json(&json).is_err());
    }

    #[test]
    fn empty_issues_rejected() {
        let json = minimal_json().replace("[42]", "[]");
        assert!(SessionConfig::from_json(&json).is_err());
    }

    #[test]
    fn per_task_overrides_win_for_their_task_only() {
        let json = serde_json::json!({
            "repository": "octo/repo",
            "issues": [1, 2],
            "work_dir": "/tmp/work",
            "routing": {"default": {"adapter": "claude-code", "model": "base"}},
            "task_routing": {
                "issue-2": {"default": {"adapter": "codex", "model": "big"}}
            },
            "task_budgets": {
                "issue-2": {"max_iterations": {"PLAN": 9}}
            }
        })
        .to_string();
        let config = SessionConfig::from_json(&json).unwrap();

        assert_eq!(config.routing_for_task("issue-1").default.model, "base");
        assert_eq!(config.routing_for_task("issue-2").default.model, "big");
        assert_eq!(config.budgets_for_task("issue-1").max_iterations(Phase::Plan), 2);
        assert_eq!(config.budgets_for_task("issue-2").max_iterations(Phase::Plan), 9);
    }

    #[test]
    fn unknown_phase_in_task_routing_rejected() {
        let json = serde_json::json!({
            "repository": "octo/repo",
            "issues": [1],
            "work_dir": "/tmp/work",
            "routing": {"default": {"adapter": "codex", "model": "m"}},
            "task_routing": {
                "issue-1": {
                    "default": {"adapter": "codex", "model": "m"},
                    "overrides": {"SHIP": {"adapter": "codex", "model": "m"}}
                }
            }
        })
        .to_string();
        assert!(SessionConfig::from_json(&json).is_err());
    }

    #[test]
    fn unknown_routing_phase_rejected() {
        let json = serde_json::json!({
            "repository": "octo/repo",
            "issues": [1],
            "work_dir": "/tmp/work",
            "routing": {
                "default": {"adapter": "codex", "model": "m"},
                "overrides": {"DEPLOY": {"adapter": "codex", "model": "m"}}
            }
        })
        .to_string();
        assert!(SessionConfig::from_json(&json).is_err());
    }
}
