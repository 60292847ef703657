//! The remote incident boundary the overlay reconciler polls.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl IncidentStatus {
    /// Terminal incidents get no overlay.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::Closed)
    }
}

/// Externally owned incident record. The reconciler treats it as
/// read-only and re-fetches it each poll; status changes go through the
/// explicit side channel on [`IncidentSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteIncident {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: IncidentPriority,
    pub status: IncidentStatus,
    /// DOM selector recorded when the incident was filed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub console_errors: Vec<String>,
}

/// Incident-list collaborator. The returned list is authoritative for
/// one poll cycle.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    async fn list_incidents(&self, page_url: &str) -> AgentResult<Vec<RemoteIncident>>;
    async fn set_status(&self, id: &str, status: IncidentStatus) -> AgentResult<()>;
}

pub type SharedIncidentSource = Arc<dyn IncidentSource>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!IncidentStatus::Open.is_terminal());
        assert!(!IncidentStatus::InProgress.is_terminal());
        assert!(IncidentStatus::Resolved.is_terminal());
        assert!(IncidentStatus::Closed.is_terminal());
    }

    #[test]
    fn incident_round_trips() {
        let incident = RemoteIncident {
            id: "inc-1".to_string(),
            title: "Broken button".to_string(),
            description: None,
            priority: IncidentPriority::High,
            status: IncidentStatus::InProgress,
            selector: Some("#save".to_string()),
            page_url: Some("/dashboard".to_string()),
            console_errors: vec!["TypeError: x is null".to_string()],
        };
        let json = serde_json::to_string(&incident).unwrap();
        let back: RemoteIncident = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "inc-1");
        assert_eq!(back.status, IncidentStatus::InProgress);
        assert_eq!(back.console_errors.len(), 1);
    }
}
