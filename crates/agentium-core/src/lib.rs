//! Core types shared across the Agentium workspace.
//!
//! This crate holds the error type, the fixed phase pipeline, the
//! line-oriented signal protocol, and the unified agent event model.
//!
//! # Main types
//!
//! - [`AgentiumError`] / [`AgentiumResult`] — workspace-wide error handling.
//! - [`Phase`] — the fixed PLAN → IMPLEMENT → DOCS → VERIFY pipeline.
//! - [`Role`] — the worker/reviewer/judge triad inside a phase.
//! - [`Verdict`] / [`AgentStatus`] — parsed agent signal lines.
//! - [`AgentEvent`] — the unified event every adapter normalizes into.

/// Error type and result alias.
pub mod error;
/// Unified agent event model.
pub mod event;
/// Phase pipeline and role triad.
pub mod phase;
/// Status and verdict signal parsing.
pub mod signal;

pub use error::{AgentiumError, AgentiumResult};
pub use event::{AgentEvent, EventKind, MAX_SUMMARY_CHARS};
pub use phase::{Phase, Role};
pub use signal::{parse_status, parse_verdicts, AgentStatus, StatusSignal, Verdict};
