//! Typed phase hand-offs: outputs, store, builders, parser, validator.
//!
//! Workers summarize each phase as an `AGENTIUM_HANDOFF:` JSON object on
//! stdout. This crate extracts those payloads, validates them, persists
//! them per task, and composes the phase inputs downstream workers receive.
//!
//! # Main types
//!
//! - [`HandoffStore`] — thread-safe per-task phase outputs with JSON
//!   persistence, replace semantics, and cascade clearing.
//! - [`PlanOutput`] / [`ImplementOutput`] / [`DocsOutput`] /
//!   [`VerifyOutput`] — the typed outputs, one per phase.
//! - [`parser`] — brace-walking extraction of hand-off payloads.
//! - [`builders`] — Markdown and JSON phase-input composition.
//! - [`validator`] — output rules and phase-entry prerequisites.

/// Phase-input composition.
pub mod builders;
/// Hand-off signal extraction.
pub mod parser;
/// Per-task hand-off persistence.
pub mod store;
/// Typed phase outputs.
pub mod types;
/// Output and prerequisite validation.
pub mod validator;

pub use builders::ExistingWork;
pub use parser::{extract_all_handoff_signals, extract_handoff_signal, parse_handoff};
pub use store::HandoffStore;
pub use types::{
    Commit, Complexity, DocsOutput, ImplementOutput, ImplementationStep, IssueContext,
    PlanOutput, ReviewOutput, TaskRecord, VerifyOutput,
};
pub use validator::{
    validate_docs, validate_implement, validate_phase_input, validate_plan, validate_verify,
};
