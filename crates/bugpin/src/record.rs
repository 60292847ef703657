//! Log and network record types stored in the bounded buffers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum stored length of a log message, in characters.
pub const MAX_MESSAGE_LEN: usize = 1000;
/// Maximum stored length of a stack trace, in characters.
pub const MAX_STACK_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Log,
    Warn,
    Error,
    Info,
    Debug,
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogKind::Log => write!(f, "log"),
            LogKind::Warn => write!(f, "warn"),
            LogKind::Error => write!(f, "error"),
            LogKind::Info => write!(f, "info"),
            LogKind::Debug => write!(f, "debug"),
        }
    }
}

/// One intercepted console call or page fault. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub kind: LogKind,
    pub message: String,
    /// Epoch milliseconds.
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl LogRecord {
    /// Build a record from raw console arguments, truncating the joined
    /// message and any stack to the stored limits.
    pub fn from_args(kind: LogKind, args: &[Value], timestamp: u64) -> Self {
        let message = args
            .iter()
            .map(stringify_arg)
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            kind,
            message: truncate(&message, MAX_MESSAGE_LEN),
            timestamp,
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: Option<&str>) -> Self {
        self.stack = stack.map(|s| truncate(s, MAX_STACK_LEN));
        self
    }
}

/// The outcome of one intercepted network call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Epoch milliseconds at completion.
    pub timestamp: u64,
}

/// Best-effort stringification of a console argument.
///
/// Strings pass through unquoted; everything else is JSON-serialized,
/// falling back to the debug coercion if serialization fails.
pub fn stringify_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
    }
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        input.to_string()
    } else {
        input.chars().take(max).collect()
    }
}
