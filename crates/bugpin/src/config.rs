use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, AgentResult};
use crate::types::{Corner, Theme};

/// Default capacity of each diagnostic buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 50;
/// Default overlay reconciler poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Caller-supplied agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Report submission endpoint. Required; also used as the marker the
    /// network recorder filters so the agent never records its own
    /// telemetry traffic.
    pub endpoint: String,
    pub console_capacity: usize,
    pub network_capacity: usize,
    /// Whether the screenshot capture step is offered at all.
    pub capture_enabled: bool,
    pub corner: Corner,
    pub theme: Theme,
    pub show_launcher: bool,
    /// Arbitrary metadata merged into every submitted report.
    pub metadata: Map<String, Value>,
    /// User identifier for attribution, if the embedder knows one.
    pub user_id: Option<String>,
    pub poll_interval_ms: u64,
}

impl AgentConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            console_capacity: DEFAULT_BUFFER_CAPACITY,
            network_capacity: DEFAULT_BUFFER_CAPACITY,
            capture_enabled: true,
            corner: Corner::BottomRight,
            theme: Theme::Auto,
            show_launcher: true,
            metadata: Map::new(),
            user_id: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Fatal-at-initialization validation: the agent refuses to mount
    /// without a submission endpoint.
    pub fn validate(&self) -> AgentResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(AgentError::Config("endpoint must not be empty".into()));
        }
        Ok(())
    }
}
