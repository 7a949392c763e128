use crate::skill::Skill;
use agentium_core::{AgentiumError, AgentiumResult, Phase};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// All skills loaded for a session, with phase-based selection.
pub struct SkillLibrary {
    skills: Vec<Arc<Skill>>,
}

impl SkillLibrary {
    /// An empty library.
    pub fn empty() -> Self {
        Self { skills: Vec::new() }
    }

    /// Load every `.md` file from a skills directory. A missing directory
    /// yields an empty library; files that fail to parse are skipped with
    /// a warning.
    pub fn load(skills_dir: &Path) -> AgentiumResult<Self> {
        let mut skills = Vec::new();

        if !skills_dir.exists() {
            info!(dir = %skills_dir.display(), "Skills directory not found, skipping");
            return Ok(Self { skills });
        }

        let entries = std::fs::read_dir(skills_dir).map_err(|e| {
            AgentiumError::Skill(format!(
                "Failed to read skills dir {}: {}",
                skills_dir.display(),
                e
            ))
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "Failed to read directory entry");
                    continue;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            match Skill::from_file(&path) {
                Ok(skill) => {
                    info!(name = %skill.name(), path = %path.display(), "Loaded skill");
                    skills.push(Arc::new(skill));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse skill, skipping");
                }
            }
        }

        skills.sort_by(|a, b| a.name().cmp(b.name()));
        info!(count = skills.len(), "Skill library loaded");
        Ok(Self { skills })
    }

    /// Skills relevant to the given phase, in name order.
    pub fn for_phase(&self, phase: Phase) -> Vec<Arc<Skill>> {
        self.skills
            .iter()
            .filter(|s| s.applies_to(phase))
            .cloned()
            .collect()
    }

    /// Number of loaded skills.
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Whether the library holds no skills.
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
