use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::warn;

use crate::buffer::BoundedBuffer;
use crate::host::types::{ConsoleTap, PageFault};
use crate::host::{FaultKind, SharedHost};
use crate::record::{LogKind, LogRecord};
use crate::utils::time::now_millis;
use crate::error::AgentResult;

/// Records every console call and page fault into a bounded buffer.
///
/// Installation is symmetric: `start()` installs the tap, `stop()`
/// removes it and the host's original entry points are untouched in
/// between — the tap only observes. A second `start()` without an
/// intervening `stop()` is a no-op with a diagnostic.
pub struct ConsoleRecorder {
    host: SharedHost,
    buffer: Arc<Mutex<BoundedBuffer<LogRecord>>>,
    started: bool,
}

struct Tap {
    buffer: Arc<Mutex<BoundedBuffer<LogRecord>>>,
}

impl ConsoleTap for Tap {
    fn on_call(&self, kind: LogKind, args: &[Value]) {
        let record = LogRecord::from_args(kind, args, now_millis());
        self.buffer.lock().expect("console buffer lock").push(record);
    }

    fn on_fault(&self, fault: &PageFault) {
        let prefix = match fault.kind {
            FaultKind::UncaughtError => "Uncaught error",
            FaultKind::UnhandledRejection => "Unhandled rejection",
        };
        let record = LogRecord::from_args(
            LogKind::Error,
            &[Value::String(format!("{prefix}: {}", fault.message))],
            now_millis(),
        )
        .with_stack(fault.stack.as_deref());
        self.buffer.lock().expect("console buffer lock").push(record);
    }
}

impl ConsoleRecorder {
    pub fn new(host: SharedHost, capacity: usize) -> Self {
        Self {
            host,
            buffer: Arc::new(Mutex::new(BoundedBuffer::new(capacity))),
            started: false,
        }
    }

    pub fn start(&mut self) -> AgentResult<()> {
        if self.started {
            warn!("console recorder already started; ignoring");
            return Ok(());
        }
        self.host.install_console_tap(Arc::new(Tap {
            buffer: self.buffer.clone(),
        }))?;
        self.started = true;
        Ok(())
    }

    pub fn stop(&mut self) -> AgentResult<()> {
        if !self.started {
            return Ok(());
        }
        self.host.remove_console_tap()?;
        self.started = false;
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.buffer.lock().expect("console buffer lock").snapshot()
    }

    pub fn clear(&self) {
        self.buffer.lock().expect("console buffer lock").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::SimHost;
    use serde_json::json;

    fn recorder_with_host() -> (Arc<SimHost>, ConsoleRecorder) {
        let host = Arc::new(SimHost::default());
        let recorder = ConsoleRecorder::new(host.clone(), 10);
        (host, recorder)
    }

    #[test]
    fn records_console_calls_after_start() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();

        host.emit_console(LogKind::Warn, vec![json!("low disk"), json!(42)]);

        let snap = recorder.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].kind, LogKind::Warn);
        assert_eq!(snap[0].message, "low disk 42");
    }

    #[test]
    fn host_console_behavior_is_unchanged_while_recording() {
        let (host, mut recorder) = recorder_with_host();
        host.emit_console(LogKind::Log, vec![json!("before")]);
        recorder.start().unwrap();
        host.emit_console(LogKind::Log, vec![json!("during")]);
        recorder.stop().unwrap();
        host.emit_console(LogKind::Log, vec![json!("after")]);

        assert_eq!(
            host.printed_lines(),
            vec!["log: before", "log: during", "log: after"]
        );
        // Only the call made while started was recorded.
        assert_eq!(recorder.snapshot().len(), 1);
    }

    #[test]
    fn stop_restores_the_entry_points() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();
        assert!(host.console_tap_installed());
        recorder.stop().unwrap();
        assert!(!host.console_tap_installed());
        assert!(!recorder.is_started());
    }

    #[test]
    fn double_start_is_a_no_op() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();
        recorder.start().unwrap();
        host.emit_console(LogKind::Info, vec![json!("once")]);
        assert_eq!(recorder.snapshot().len(), 1);
        recorder.stop().unwrap();
        assert!(!host.console_tap_installed());
    }

    #[test]
    fn faults_become_error_records_with_stack() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();

        let stack = "at handler (app.js:10)\n".repeat(200);
        host.emit_fault(PageFault {
            kind: FaultKind::UnhandledRejection,
            message: "fetch rejected".to_string(),
            stack: Some(stack),
        });

        let snap = recorder.snapshot();
        assert_eq!(snap[0].kind, LogKind::Error);
        assert!(snap[0].message.starts_with("Unhandled rejection: fetch rejected"));
        assert_eq!(
            snap[0].stack.as_ref().unwrap().chars().count(),
            crate::record::MAX_STACK_LEN
        );
    }

    #[test]
    fn buffer_is_bounded() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();
        for n in 0..25 {
            host.emit_console(LogKind::Error, vec![json!(format!("err {n}"))]);
        }
        let snap = recorder.snapshot();
        assert_eq!(snap.len(), 10);
        assert_eq!(snap[0].message, "err 15");
    }

    #[test]
    fn clear_empties_buffer() {
        let (host, mut recorder) = recorder_with_host();
        recorder.start().unwrap();
        host.emit_console(LogKind::Log, vec![json!("x")]);
        recorder.clear();
        assert!(recorder.snapshot().is_empty());
    }
}
