//! Agent adapters: a uniform driver API over heterogeneous coding CLIs.
//!
//! Each supported CLI (Claude Code, Codex, Aider) gets an adapter that
//! builds its environment, command line, and prompt, then parses its
//! native output — NDJSON, CLI events, or plain text — into the unified
//! [`IterationResult`] and event stream.
//!
//! # Main types
//!
//! - [`AgentAdapter`] — the capability set adapters implement.
//! - [`AdapterRegistry`] — name → factory mapping, injectable for tests.
//! - [`IterationResult`] — the normalized outcome of one invocation.
//! - [`run_agent`] — subprocess launcher with cancellation.

/// Adapter trait and invocation context.
pub mod adapter;
/// Built-in adapters.
pub mod adapters;
/// Codex-style CLI event mapping.
pub mod cli_events;
/// Agent environment construction.
pub mod env;
/// Subprocess launching.
pub mod launcher;
/// Claude-style NDJSON parsing.
pub mod ndjson;
/// Prompt assembly.
pub mod prompt;
/// Adapter registry.
pub mod registry;
/// Normalized invocation results.
pub mod result;

pub use adapter::{AgentAdapter, Invocation};
pub use adapters::{AiderAdapter, ClaudeCodeAdapter, CodexAdapter};
pub use launcher::run_agent;
pub use prompt::{PromptParts, SkillBlock};
pub use registry::{AdapterFactory, AdapterRegistry};
pub use result::{IterationResult, TokenUsage};
