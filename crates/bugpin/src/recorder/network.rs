use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, warn};

use crate::buffer::BoundedBuffer;
use crate::error::AgentResult;
use crate::host::types::{NetworkOutcome, NetworkTap};
use crate::host::SharedHost;
use crate::record::NetworkRecord;
use crate::utils::time::now_millis;

/// Records the outcome of every outbound network call into a bounded
/// buffer, filtering out the agent's own report-submission traffic.
///
/// Bookkeeping is two-phase: the host reports call-open (which stamps
/// the start time) and call-settle (success, failure, or aborted with
/// no status ever set). Both the promise-style and the event-style
/// primitive go through the same tap.
pub struct NetworkRecorder {
    host: SharedHost,
    tap: Arc<Tap>,
    started: bool,
}

struct Pending {
    method: String,
    url: String,
    opened: Instant,
}

struct Tap {
    buffer: Mutex<BoundedBuffer<NetworkRecord>>,
    pending: Mutex<HashMap<u64, Pending>>,
    next_token: AtomicU64,
    /// URL marker for the agent's own submission endpoint.
    endpoint_marker: String,
}

impl Tap {
    /// Buffer a completed call unless it targets the agent's own
    /// endpoint; recording our own telemetry would feed back on itself.
    fn add_record(&self, record: NetworkRecord) {
        if self.endpoint_marker.is_empty() || !record.url.contains(&self.endpoint_marker) {
            self.buffer.lock().expect("network buffer lock").push(record);
        } else {
            debug!(url = %record.url, "skipping own report traffic");
        }
    }
}

impl NetworkTap for Tap {
    fn on_open(&self, method: &str, url: &str) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().expect("pending lock").insert(
            token,
            Pending {
                method: method.to_string(),
                url: url.to_string(),
                opened: Instant::now(),
            },
        );
        token
    }

    fn on_settle(&self, token: u64, outcome: NetworkOutcome) {
        let Some(pending) = self.pending.lock().expect("pending lock").remove(&token) else {
            warn!(token, "network settle for unknown token");
            return;
        };
        let duration_ms = pending.opened.elapsed().as_millis() as u64;
        let mut record = NetworkRecord {
            method: pending.method,
            url: pending.url,
            status: None,
            status_text: None,
            duration_ms: Some(duration_ms),
            error: None,
            timestamp: now_millis(),
        };
        match outcome {
            NetworkOutcome::Success { status, status_text } => {
                record.status = Some(status);
                record.status_text = Some(status_text);
            }
            NetworkOutcome::Failure { error } => {
                record.error = Some(error);
            }
            NetworkOutcome::Aborted => {
                record.error = Some("request aborted".to_string());
            }
        }
        self.add_record(record);
    }
}

impl NetworkRecorder {
    pub fn new(host: SharedHost, capacity: usize, endpoint_marker: &str) -> Self {
        Self {
            host,
            tap: Arc::new(Tap {
                buffer: Mutex::new(BoundedBuffer::new(capacity)),
                pending: Mutex::new(HashMap::new()),
                next_token: AtomicU64::new(1),
                endpoint_marker: endpoint_marker.to_string(),
            }),
            started: false,
        }
    }

    pub fn start(&mut self) -> AgentResult<()> {
        if self.started {
            warn!("network recorder already started; ignoring");
            return Ok(());
        }
        self.host.install_network_tap(self.tap.clone())?;
        self.started = true;
        Ok(())
    }

    pub fn stop(&mut self) -> AgentResult<()> {
        if !self.started {
            return Ok(());
        }
        self.host.remove_network_tap()?;
        self.started = false;
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn snapshot(&self) -> Vec<NetworkRecord> {
        self.tap.buffer.lock().expect("network buffer lock").snapshot()
    }

    pub fn clear(&self) {
        self.tap.buffer.lock().expect("network buffer lock").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::SimHost;

    fn recorder_with_host() -> (Arc<SimHost>, NetworkRecorder) {
        let host = Arc::new(SimHost::default());
        let recorder = NetworkRecorder::new(host.clone(), 10, "/api/reports");
        (host, recorder)
    }

    #[test]
    fn records_successful_calls() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();

        host.simulate_fetch(
            "GET",
            "/api/users",
            NetworkOutcome::Success {
                status: 200,
                status_text: "OK".to_string(),
            },
        );

        let snap = recorder.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].method, "GET");
        assert_eq!(snap[0].url, "/api/users");
        assert_eq!(snap[0].status, Some(200));
        assert_eq!(snap[0].status_text.as_deref(), Some("OK"));
        assert!(snap[0].duration_ms.is_some());
        assert!(snap[0].error.is_none());
    }

    #[test]
    fn records_failed_calls_with_error() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();

        host.simulate_fetch(
            "POST",
            "/api/users",
            NetworkOutcome::Failure {
                error: "connection refused".to_string(),
            },
        );

        let snap = recorder.snapshot();
        assert_eq!(snap[0].status, None);
        assert_eq!(snap[0].error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn records_aborted_calls_without_status() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();

        let token = host.begin_request("GET", "/api/slow").unwrap();
        host.settle_request(token, NetworkOutcome::Aborted);

        let snap = recorder.snapshot();
        assert_eq!(snap[0].status, None);
        assert_eq!(snap[0].error.as_deref(), Some("request aborted"));
    }

    #[test]
    fn own_report_traffic_is_never_recorded() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();

        host.simulate_fetch(
            "POST",
            "https://app.example.com/api/reports",
            NetworkOutcome::Success {
                status: 201,
                status_text: "Created".to_string(),
            },
        );
        host.simulate_fetch(
            "GET",
            "/api/widgets",
            NetworkOutcome::Success {
                status: 200,
                status_text: "OK".to_string(),
            },
        );

        let snap = recorder.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].url, "/api/widgets");
    }

    #[test]
    fn stop_restores_both_primitives() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();
        assert!(host.network_tap_installed());
        recorder.stop().unwrap();
        assert!(!host.network_tap_installed());

        host.simulate_fetch(
            "GET",
            "/api/after",
            NetworkOutcome::Success {
                status: 200,
                status_text: "OK".to_string(),
            },
        );
        assert!(recorder.snapshot().is_empty());
    }

    #[test]
    fn double_start_is_a_no_op() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();
        recorder.start().unwrap();
        assert!(host.network_tap_installed());
        recorder.stop().unwrap();
        assert!(!host.network_tap_installed());
    }

    #[test]
    fn buffer_is_bounded_fifo() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();
        for n in 0..15 {
            host.simulate_fetch(
                "GET",
                &format!("/api/item/{n}"),
                NetworkOutcome::Success {
                    status: 200,
                    status_text: "OK".to_string(),
                },
            );
        }
        let snap = recorder.snapshot();
        assert_eq!(snap.len(), 10);
        assert_eq!(snap[0].url, "/api/item/5");
    }
}
