use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AgentiumError;

/// One stage of the fixed pipeline. Phases run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Plan,
    Implement,
    Docs,
    Verify,
}

impl Phase {
    /// All phases in pipeline order.
    pub const ALL: [Phase; 4] = [Phase::Plan, Phase::Implement, Phase::Docs, Phase::Verify];

    /// The phase after this one, or `None` for the last phase.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Plan => Some(Phase::Implement),
            Phase::Implement => Some(Phase::Docs),
            Phase::Docs => Some(Phase::Verify),
            Phase::Verify => None,
        }
    }

    /// Whether this is the final phase of the pipeline.
    pub fn is_last(self) -> bool {
        self.next().is_none()
    }

    /// Phases strictly before this one, in pipeline order.
    pub fn upstream(self) -> Vec<Phase> {
        Phase::ALL.iter().copied().filter(|p| *p < self).collect()
    }

    /// This phase and every phase after it, in pipeline order.
    pub fn from_here_on(self) -> Vec<Phase> {
        Phase::ALL.iter().copied().filter(|p| *p >= self).collect()
    }

    /// Default iteration budget for this phase.
    pub fn default_max_iterations(self) -> u32 {
        match self {
            Phase::Plan => 2,
            Phase::Implement => 5,
            Phase::Docs => 2,
            Phase::Verify => 3,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Plan => "PLAN",
            Phase::Implement => "IMPLEMENT",
            Phase::Docs => "DOCS",
            Phase::Verify => "VERIFY",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Phase {
    type Err = AgentiumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PLAN" => Ok(Phase::Plan),
            "IMPLEMENT" => Ok(Phase::Implement),
            "DOCS" => Ok(Phase::Docs),
            "VERIFY" => Ok(Phase::Verify),
            other => Err(AgentiumError::Config(format!("Unknown phase: {other}"))),
        }
    }
}

/// One of the three LLM invocations inside a phase iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Worker,
    Reviewer,
    Judge,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Worker => "worker",
            Role::Reviewer => "reviewer",
            Role::Judge => "judge",
        };
        write!(f, "{s}")
    }
}
