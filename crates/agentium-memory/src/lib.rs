//! Cross-iteration memory: signal parsing, storage, and context rendering.
//!
//! Agents emit `AGENTIUM_MEMORY: <TYPE> <content>` lines to remember facts
//! across iterations. This crate parses those signals, stores them with
//! pruning and resolve-pending semantics, and renders budget-bounded
//! Markdown context for later prompts.
//!
//! # Main types
//!
//! - [`MemoryStore`] — the pruned, task-scoped entry store with JSON
//!   persistence and the context renderers.
//! - [`SignalType`] / [`MemoryEntry`] — the entry model.
//! - [`parse_memory_signals`] — stdout line parsing.

/// Context rendering.
pub mod context;
/// Signal line parsing.
pub mod signals;
/// Entry storage and persistence.
pub mod store;
/// Entry and signal types.
pub mod types;

pub use signals::parse_memory_signals;
pub use store::{MemoryStore, DEFAULT_CONTEXT_BUDGET, DEFAULT_MAX_ENTRIES};
pub use types::{MemoryEntry, ParsedSignal, SignalType};
