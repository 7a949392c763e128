//! Line-oriented signal protocol shared by every adapter.
//!
//! Agents communicate with the controller through well-known line prefixes
//! on stdout: `AGENTIUM_STATUS`, `AGENTIUM_EVAL`, `AGENTIUM_MEMORY`, and
//! `AGENTIUM_HANDOFF`. This module parses the first two; memory and
//! hand-off signals are parsed by their owning crates.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[allow(clippy::unwrap_used)]
static STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^AGENTIUM_STATUS:[ \t]+([A-Z_]+)(?:[ \t]+(.*))?$").unwrap());

#[allow(clippy::unwrap_used)]
static EVAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^AGENTIUM_EVAL:[ \t]+(ADVANCE|ITERATE|BLOCKED)[ \t]*(.*)$").unwrap()
});

/// Self-reported agent status (`AGENTIUM_STATUS: <NAME> [<message>]`).
///
/// Orthogonal to the judge verdict channel: status never drives phase
/// transitions, it only annotates the iteration result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    TestsRunning,
    TestsPassed,
    TestsFailed,
    PrCreated,
    Complete,
    NothingToDo,
    Blocked,
    Failed,
    Pushed,
    Analyzing,
}

impl AgentStatus {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "TESTS_RUNNING" => Some(Self::TestsRunning),
            "TESTS_PASSED" => Some(Self::TestsPassed),
            "TESTS_FAILED" => Some(Self::TestsFailed),
            "PR_CREATED" => Some(Self::PrCreated),
            "COMPLETE" => Some(Self::Complete),
            "NOTHING_TO_DO" => Some(Self::NothingToDo),
            "BLOCKED" => Some(Self::Blocked),
            "FAILED" => Some(Self::Failed),
            "PUSHED" => Some(Self::Pushed),
            "ANALYZING" => Some(Self::Analyzing),
            _ => None,
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TestsRunning => "TESTS_RUNNING",
            Self::TestsPassed => "TESTS_PASSED",
            Self::TestsFailed => "TESTS_FAILED",
            Self::PrCreated => "PR_CREATED",
            Self::Complete => "COMPLETE",
            Self::NothingToDo => "NOTHING_TO_DO",
            Self::Blocked => "BLOCKED",
            Self::Failed => "FAILED",
            Self::Pushed => "PUSHED",
            Self::Analyzing => "ANALYZING",
        };
        write!(f, "{s}")
    }
}

/// A parsed status signal with its optional free-form message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSignal {
    pub status: AgentStatus,
    pub message: Option<String>,
}

/// Extract the effective status from agent stdout. Last occurrence wins;
/// lines with unknown status names are skipped.
pub fn parse_status(stdout: &str) -> Option<StatusSignal> {
    let mut last = None;
    for caps in STATUS_RE.captures_iter(stdout) {
        let Some(status) = AgentStatus::from_name(&caps[1]) else {
            continue;
        };
        let message = caps
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .filter(|m| !m.is_empty());
        last = Some(StatusSignal { status, message });
    }
    last
}

/// Judge verdict (`AGENTIUM_EVAL: ...`) deciding the phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "UPPERCASE")]
pub enum Verdict {
    Advance,
    Iterate { reason: String },
    Blocked { reason: String },
}

impl Verdict {
    /// Short human-readable reason, empty for ADVANCE.
    pub fn reason(&self) -> &str {
        match self {
            Verdict::Advance => "",
            Verdict::Iterate { reason } | Verdict::Blocked { reason } => reason,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Advance => write!(f, "ADVANCE"),
            Verdict::Iterate { reason } => write!(f, "ITERATE {reason}"),
            Verdict::Blocked { reason } => write!(f, "BLOCKED {reason}"),
        }
    }
}

/// Extract every `AGENTIUM_EVAL` verdict line from judge stdout, in order.
///
/// The contract is exactly one per judge run; the caller decides what to do
/// when the stream carries zero or several.
pub fn parse_verdicts(stdout: &str) -> Vec<Verdict> {
    EVAL_RE
        .captures_iter(stdout)
        .map(|caps| {
            let reason = caps[2].trim().to_string();
            match &caps[1] {
                "ADVANCE" => Verdict::Advance,
                "ITERATE" => Verdict::Iterate { reason },
                _ => Verdict::Blocked { reason },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_last_occurrence_wins() {
        let out = "AGENTIUM_STATUS: ANALYZING\nsome work\nAGENTIUM_STATUS: TESTS_PASSED all green\n";
        let sig = parse_status(out).unwrap();
        assert_eq!(sig.status, AgentStatus::TestsPassed);
        assert_eq!(sig.message.as_deref(), Some("all green"));
    }

    #[test]
    fn status_unknown_name_skipped() {
        let out = "AGENTIUM_STATUS: DANCING\nAGENTIUM_STATUS: PUSHED\n";
        let sig = parse_status(out).unwrap();
        assert_eq!(sig.status, AgentStatus::Pushed);
        assert!(sig.message.is_none());
    }

    #[test]
    fn status_must_start_the_line() {
        let out = "note: AGENTIUM_STATUS: COMPLETE\n";
        assert!(parse_status(out).is_none());
    }

    #[test]
    fn verdict_advance() {
        let v = parse_verdicts("AGENTIUM_EVAL: ADVANCE\n");
        assert_eq!(v, vec![Verdict::Advance]);
    }

    #[test]
    fn verdict_iterate_with_reason() {
        let v = parse_verdicts("thinking...\nAGENTIUM_EVAL: ITERATE tests are missing\n");
        assert_eq!(
            v,
            vec![Verdict::Iterate {
                reason: "tests are missing".into()
            }]
        );
    }

    #[test]
    fn verdict_blocked_with_reason() {
        let v = parse_verdicts("AGENTIUM_EVAL: BLOCKED cannot resolve conflict\n");
        assert_eq!(
            v,
            vec![Verdict::Blocked {
                reason: "cannot resolve conflict".into()
            }]
        );
    }

    #[test]
    fn multiple_verdicts_preserved_in_order() {
        let out = "AGENTIUM_EVAL: ITERATE first\nAGENTIUM_EVAL: ADVANCE\n";
        let v = parse_verdicts(out);
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].reason(), "first");
    }

    #[test]
    fn no_verdict_in_plain_text() {
        assert!(parse_verdicts("the change looks fine to me").is_empty());
    }
}
