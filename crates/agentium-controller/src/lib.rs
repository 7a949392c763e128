//! The Agentium controller: session model, phase driver, routing, and
//! scope enforcement.
//!
//! One controller process owns a session. For each configured issue it
//! drives the PLAN → IMPLEMENT → DOCS → VERIFY pipeline through bounded
//! worker/reviewer/judge iterations until the task completes or blocks.
//!
//! # Main types
//!
//! - [`PhaseDriver`] — the state machine.
//! - [`Session`] / [`SessionConfig`] — session configuration and runtime
//!   state.
//! - [`ModelRouter`] — per-phase adapter/model routing.
//! - [`ScopeValidator`] — package-path confinement of agent edits.

/// The phase state machine.
pub mod driver;
/// Model and adapter routing.
pub mod router;
/// Package-scope enforcement.
pub mod scope;
/// Session configuration and state.
pub mod session;

pub use driver::{
    AgentLauncher, PhaseDriver, SessionReport, SubprocessLauncher, TaskOutcome,
};
pub use router::{ModelRouter, RouteTarget};
pub use scope::ScopeValidator;
pub use session::{Budgets, Session, SessionConfig, TraceConfig};
