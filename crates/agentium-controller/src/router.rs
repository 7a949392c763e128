use agentium_core::Phase;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Adapter and model for one set of invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub adapter: String,
    pub model: String,
}

/// Per-phase model routing: a default target plus phase overrides.
///
/// Override keys are kept as raw strings so a config typo surfaces
/// through [`ModelRouter::unknown_phases`] instead of silently vanishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRouter {
    pub default: RouteTarget,
    #[serde(default)]
    pub overrides: HashMap<String, RouteTarget>,
}

impl ModelRouter {
    /// Routing with no overrides.
    pub fn uniform(adapter: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            default: RouteTarget {
                adapter: adapter.into(),
                model: model.into(),
            },
            overrides: HashMap::new(),
        }
    }

    /// The route for a phase: its override when set, else the default.
    pub fn route_for_phase(&self, phase: Phase) -> &RouteTarget {
        self.overrides.get(&phase.to_string()).unwrap_or(&self.default)
    }

    /// The model for a phase.
    pub fn model_for_phase(&self, phase: Phase) -> &str {
        &self.route_for_phase(phase).model
    }

    /// Sorted, deduplicated set of every referenced adapter name.
    pub fn adapters(&self) -> Vec<String> {
        let mut names: Vec<String> = std::iter::once(self.default.adapter.clone())
            .chain(self.overrides.values().map(|t| t.adapter.clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Override keys that do not name a pipeline phase. Matching is exact:
    /// lookups go by the canonical uppercase names, so anything else is
    /// dead configuration.
    pub fn unknown_phases(&self) -> Vec<String> {
        let mut unknown: Vec<String> = self
            .overrides
            .keys()
            .filter(|k| Phase::from_str(k).is_err() || k.as_str() != k.to_ascii_uppercase())
            .cloned()
            .collect();
        unknown.sort();
        unknown
    }
}
