//! Prompt skills and system/project prompt loading.
//!
//! Skills are markdown files with YAML frontmatter tagging the phases they
//! apply to; the controller injects the relevant ones into each worker
//! prompt. The system prompt ships embedded with an optional bounded
//! remote override; the project prompt lives in the repository.

/// Skill library with phase selection.
pub mod library;
/// System and project prompt loading.
pub mod prompts;
/// Markdown skill parsing.
pub mod skill;

pub use library::SkillLibrary;
pub use prompts::{
    load_project_prompt, load_system_prompt, EMBEDDED_SYSTEM_PROMPT, REMOTE_PROMPT_CAP_BYTES,
};
pub use skill::{Skill, SkillFrontmatter};
