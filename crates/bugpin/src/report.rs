//! The outbound submission boundary: payload, sink trait, and hooks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::annotate::Annotation;
use crate::capture::Screenshot;
use crate::error::{AgentError, AgentResult};
use crate::fingerprint::EnvironmentSnapshot;
use crate::picker::SelectedElement;
use crate::record::{LogRecord, NetworkRecord};
use crate::types::{ReportType, Severity};

/// The immutable payload assembled at submit time. The sink owns
/// transport, auth and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedReport {
    pub report_type: ReportType,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub selected_elements: Vec<SelectedElement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<Screenshot>,
    pub annotations: Vec<Annotation>,
    pub console_logs: Vec<LogRecord>,
    pub network_logs: Vec<NetworkRecord>,
    pub environment: EnvironmentSnapshot,
    pub session_id: String,
    /// RFC 3339 submission timestamp.
    pub submitted_at: String,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitAck {
    /// Server-assigned report id, when the backend returns one.
    pub id: Option<String>,
}

/// Submission collaborator supplied by the embedder.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn submit(&self, report: &SubmittedReport) -> AgentResult<SubmitAck>;
}

pub type SharedSink = Arc<dyn ReportSink>;

/// May veto or transform the payload before submission. Returning
/// `None` aborts with [`AgentError::Cancelled`].
pub type BeforeSubmitHook = Arc<dyn Fn(SubmittedReport) -> Option<SubmittedReport> + Send + Sync>;
pub type SuccessHook = Arc<dyn Fn(&SubmitAck) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&AgentError) + Send + Sync>;

/// Informational and veto hooks around submission.
#[derive(Clone, Default)]
pub struct SubmitHooks {
    pub before: Option<BeforeSubmitHook>,
    pub on_success: Option<SuccessHook>,
    pub on_error: Option<ErrorHook>,
}

impl SubmitHooks {
    /// Run the before-submit hook, if any.
    pub fn apply_before(&self, report: SubmittedReport) -> AgentResult<SubmittedReport> {
        match &self.before {
            Some(hook) => hook(report).ok_or(AgentError::Cancelled),
            None => Ok(report),
        }
    }

    pub fn notify_success(&self, ack: &SubmitAck) {
        if let Some(hook) = &self.on_success {
            hook(ack);
        }
    }

    pub fn notify_error(&self, err: &AgentError) {
        if let Some(hook) = &self.on_error {
            hook(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::DeviceClass;

    pub(crate) fn sample_report() -> SubmittedReport {
        SubmittedReport {
            report_type: ReportType::Bug,
            title: "Button unresponsive".to_string(),
            description: String::new(),
            severity: Severity::Medium,
            selected_elements: Vec::new(),
            screenshot: None,
            annotations: Vec::new(),
            console_logs: Vec::new(),
            network_logs: Vec::new(),
            environment: EnvironmentSnapshot {
                url: "https://app.example.com/x".to_string(),
                title: "X".to_string(),
                user_agent: "ua".to_string(),
                browser_name: "Chrome".to_string(),
                browser_version: "120".to_string(),
                os_name: "Windows".to_string(),
                os_version: "10".to_string(),
                device: DeviceClass::Desktop,
                screen_width: 1920,
                screen_height: 1080,
                viewport_width: 1280,
                viewport_height: 720,
                locale: "en-US".to_string(),
                timezone: "UTC".to_string(),
                cookies_enabled: true,
                do_not_track: false,
            },
            session_id: "sess".to_string(),
            submitted_at: "2026-01-01T00:00:00Z".to_string(),
            metadata: Map::new(),
            user_id: None,
        }
    }

    #[test]
    fn before_hook_can_transform() {
        let hooks = SubmitHooks {
            before: Some(Arc::new(|mut report| {
                report.title = format!("[triaged] {}", report.title);
                Some(report)
            })),
            ..Default::default()
        };
        let out = hooks.apply_before(sample_report()).unwrap();
        assert_eq!(out.title, "[triaged] Button unresponsive");
    }

    #[test]
    fn before_hook_can_veto() {
        let hooks = SubmitHooks {
            before: Some(Arc::new(|_| None)),
            ..Default::default()
        };
        assert!(matches!(
            hooks.apply_before(sample_report()),
            Err(AgentError::Cancelled)
        ));
    }

    #[test]
    fn no_hooks_pass_through() {
        let hooks = SubmitHooks::default();
        assert!(hooks.apply_before(sample_report()).is_ok());
        hooks.notify_success(&SubmitAck::default());
        hooks.notify_error(&AgentError::Cancelled);
    }

    #[test]
    fn payload_serializes_camel_case() {
        let json = serde_json::to_value(sample_report()).unwrap();
        assert!(json.get("reportType").is_some());
        assert!(json.get("sessionId").is_some());
        assert!(json.get("consoleLogs").is_some());
        assert!(json.get("screenshot").is_none());
    }
}
