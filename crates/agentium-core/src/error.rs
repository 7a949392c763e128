use thiserror::Error;

/// A convenience `Result` alias using [`AgentiumError`].
pub type AgentiumResult<T> = Result<T, AgentiumError>;

/// Top-level error type for the Agentium orchestrator.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Error, Debug)]
pub enum AgentiumError {
    /// An error from the phase driver or session lifecycle.
    #[error("Controller error: {0}")]
    Controller(String),

    /// An error in the hand-off store, builders, parser, or validator.
    #[error("Handoff error: {0}")]
    Handoff(String),

    /// An error in the memory store or context rendering.
    #[error("Memory error: {0}")]
    Memory(String),

    /// An error from an agent adapter or subprocess launch.
    #[error("Adapter error: {0}")]
    Adapter(String),

    /// An error from the observability tracer or its exporter.
    #[error("Trace error: {0}")]
    Trace(String),

    /// An error in skill loading or prompt assembly.
    #[error("Skill error: {0}")]
    Skill(String),

    /// An error from the GitHub REST interface.
    #[error("GitHub error: {0}")]
    GitHub(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The session was cancelled from the outside.
    #[error("Cancelled")]
    Cancelled,
}
