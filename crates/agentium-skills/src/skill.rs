use agentium_core::{AgentiumError, AgentiumResult, Phase};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// YAML frontmatter parsed from a markdown skill file.
#[derive(Debug, Clone, Deserialize)]
pub struct SkillFrontmatter {
    pub name: String,
    pub description: String,
    /// Phases this skill is relevant to. Empty means every phase.
    #[serde(default)]
    pub phases: Vec<String>,
}

/// A phase-tagged prompt skill defined as a markdown file.
///
/// File format:
/// ```markdown
/// ---
/// name: git_workflow
/// description: Branch and commit conventions
/// phases: [PLAN, IMPLEMENT]
/// ---
///
/// Create one feature branch per issue...
/// ```
pub struct Skill {
    frontmatter: SkillFrontmatter,
    phases: Vec<Phase>,
    content: String,
    source_path: PathBuf,
}

impl Skill {
    /// Parse a markdown file into a skill.
    pub fn from_file(path: &Path) -> AgentiumResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AgentiumError::Skill(format!("Failed to read skill {}: {}", path.display(), e))
        })?;
        Self::parse(&raw, path.to_path_buf())
    }

    /// Parse markdown content with YAML frontmatter.
    pub fn parse(raw: &str, source_path: PathBuf) -> AgentiumResult<Self> {
        let (frontmatter, content) = split_frontmatter(raw)?;

        let mut phases = Vec::new();
        for name in &frontmatter.phases {
            let phase: Phase = name
                .parse()
                .map_err(|_| AgentiumError::Skill(format!("Unknown phase in skill: {name}")))?;
            phases.push(phase);
        }

        Ok(Self {
            frontmatter,
            phases,
            content,
            source_path,
        })
    }

    pub fn name(&self) -> &str {
        &self.frontmatter.name
    }

    pub fn description(&self) -> &str {
        &self.frontmatter.description
    }

    /// The markdown body, without frontmatter.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Whether this skill applies to the given phase.
    pub fn applies_to(&self, phase: Phase) -> bool {
        self.phases.is_empty() || self.phases.contains(&phase)
    }
}

/// Split raw markdown into frontmatter and body content.
fn split_frontmatter(raw: &str) -> AgentiumResult<(SkillFrontmatter, String)> {
    let trimmed = raw.trim();
    if !trimmed.starts_with("---") {
        return Err(AgentiumError::Skill(
            "Skill must start with YAML frontmatter (---)".to_string(),
        ));
    }

    let after_open = &trimmed[3..];
    let close_pos = after_open.find("---").ok_or_else(|| {
        AgentiumError::Skill("Skill missing closing frontmatter delimiter (---)".to_string())
    })?;

    let yaml_str = &after_open[..close_pos];
    let content = after_open[close_pos + 3..].trim().to_string();

    let frontmatter: SkillFrontmatter = serde_yaml_ng::from_str(yaml_str)
        .map_err(|e| AgentiumError::Skill(format!("Invalid YAML frontmatter: {e}")))?;

    Ok((frontmatter, content))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"---
name: git_workflow
description: Branch and commit conventions
phases: [PLAN, IMPLEMENT]
---

Create one feature branch per issue.
Commit in small, reviewable steps.
"#;

    const UNTAGGED: &str = r#"---
name: tone
description: Writing style for agent output
---

Be terse.
"#;

    #[test]
    fn parses_frontmatter_and_body() {
        let skill = Skill::parse(SAMPLE, PathBuf::from("git.md")).unwrap();
        assert_eq!(skill.name(), "git_workflow");
        assert!(skill.content().contains("feature branch"));
        assert!(skill.applies_to(Phase::Plan));
        assert!(skill.applies_to(Phase::Implement));
        assert!(!skill.applies_to(Phase::Verify));
    }

    #[test]
    fn untagged_skill_applies_everywhere() {
        let skill = Skill::parse(UNTAGGED, PathBuf::from("tone.md")).unwrap();
        for phase in Phase::ALL {
            assert!(skill.applies_to(phase));
        }
    }

    #[test]
    fn missing_frontmatter_rejected() {
        assert!(Skill::parse("No frontmatter", PathBuf::from("bad.md")).is_err());
    }

    #[test]
    fn unknown_phase_rejected() {
        let raw = "---\nname: x\ndescription: y\nphases: [DEPLOY]\n---\nbody";
        assert!(Skill::parse(raw, PathBuf::from("bad.md")).is_err());
    }

    #[test]
    fn invalid_yaml_rejected() {
        let raw = "---\n[broken\n---\nbody";
        assert!(Skill::parse(raw, PathBuf::from("bad.md")).is_err());
    }
}
