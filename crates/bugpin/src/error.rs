use std::fmt;

/// Unified error type for the bugpin crate.
#[derive(Debug, Clone)]
pub enum AgentError {
    /// The host does not support the requested capability.
    NotSupported(String),
    /// Invalid input provided by the caller.
    InvalidInput(String),
    /// Invalid agent configuration; the agent will not mount.
    Config(String),
    /// A capture stage failed. Recoverable; the pipeline falls through.
    Capture(String),
    /// Report submission failed. Recoverable; the draft is retained.
    Submit(String),
    /// Submission was vetoed by the before-submit hook.
    Cancelled,
    /// Internal error.
    Internal(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::NotSupported(what) => write!(f, "not supported by host: {what}"),
            AgentError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            AgentError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            AgentError::Capture(msg) => write!(f, "capture failed: {msg}"),
            AgentError::Submit(msg) => write!(f, "submission failed: {msg}"),
            AgentError::Cancelled => write!(f, "cancelled"),
            AgentError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for AgentError {}

/// Result type alias using [`AgentError`].
pub type AgentResult<T> = Result<T, AgentError>;
