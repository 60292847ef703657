//! The multi-step report composition flow: owns the draft, drives the
//! element picker, the capture pipeline and the annotation canvas, and
//! hands the assembled payload to the submission boundary.

pub mod draft;
pub mod state;

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::annotate::AnnotationCanvas;
use crate::bus::{AgentEvent, Bus};
use crate::capture::{
    area_qualifies, CaptureOutcome, CapturePipeline, CaptureRequest,
};
use crate::config::AgentConfig;
use crate::dom::NodeId;
use crate::error::AgentResult;
use crate::fingerprint::EnvironmentSnapshot;
use crate::host::{OverlayKind, OverlayNode, SharedHost};
use crate::picker::{ElementPicker, PickerState};
use crate::recorder::{ConsoleRecorder, NetworkRecorder};
use crate::report::{SharedSink, SubmitHooks, SubmittedReport};
use crate::types::{Point, Rect, ReportType, Severity, Size};
use crate::utils::time::now_rfc3339;

pub use draft::DraftReport;
pub use state::{advance_from_capture, back_from_details, StepView, WizardStep};

/// Ticks of the auto-close countdown after a successful submission,
/// one per second.
pub const SUCCESS_COUNTDOWN_TICKS: u32 = 30;

/// A keyboard event delivered to the wizard. The embedder translates
/// raw key codes into these before forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    Enter,
    Escape,
}

/// What the embedder should do next after a key press. Capture runs are
/// async, so the wizard signals them instead of starting them inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    StartFullCapture,
}

pub struct ReportWizard {
    host: SharedHost,
    config: AgentConfig,
    sink: SharedSink,
    hooks: SubmitHooks,
    bus: Bus,
    console: Arc<Mutex<ConsoleRecorder>>,
    network: Arc<Mutex<NetworkRecorder>>,
    session_id: String,
    pipeline: CapturePipeline,
    picker: ElementPicker,
    canvas: Option<AnnotationCanvas>,
    step: WizardStep,
    draft: DraftReport,
    panel: Option<NodeId>,
    area_active: bool,
    area_anchor: Option<Point>,
    area_overlay: Option<NodeId>,
    submit_in_flight: bool,
    submit_error: Option<String>,
    countdown: u32,
    text_field_focused: bool,
}

impl ReportWizard {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: SharedHost,
        config: AgentConfig,
        sink: SharedSink,
        hooks: SubmitHooks,
        bus: Bus,
        console: Arc<Mutex<ConsoleRecorder>>,
        network: Arc<Mutex<NetworkRecorder>>,
        session_id: String,
    ) -> Self {
        Self {
            picker: ElementPicker::new(host.clone()),
            host,
            config,
            sink,
            hooks,
            bus,
            console,
            network,
            session_id,
            pipeline: CapturePipeline::standard(),
            canvas: None,
            step: WizardStep::Closed,
            draft: DraftReport::default(),
            panel: None,
            area_active: false,
            area_anchor: None,
            area_overlay: None,
            submit_in_flight: false,
            submit_error: None,
            countdown: 0,
            text_field_focused: false,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &DraftReport {
        &self.draft
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submit_in_flight
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn is_picking(&self) -> bool {
        self.picker.state() == PickerState::Picking
    }

    pub fn area_selection_active(&self) -> bool {
        self.area_active
    }

    // ---- lifecycle ----

    pub fn open(&mut self) {
        if self.step.is_open() {
            return;
        }
        let viewport = self.host.screen();
        let panel = Rect::new(
            viewport.viewport_width as f64 - 380.0,
            viewport.viewport_height as f64 - 520.0,
            360.0,
            500.0,
        );
        self.panel = self
            .host
            .mount_overlay(OverlayNode::new(OverlayKind::WizardPanel, panel))
            .ok();
        self.bus.publish(AgentEvent::WizardOpened);
        self.set_step(WizardStep::TypeSelect);
    }

    /// Close from any step, tearing down every sub-mode and resetting
    /// the draft.
    pub fn close(&mut self) {
        if !self.step.is_open() {
            return;
        }
        self.cancel_element_picking();
        self.cancel_area_selection();
        if let Some(panel) = self.panel.take() {
            let _ = self.host.remove_overlay(panel);
        }
        self.draft = DraftReport::default();
        self.canvas = None;
        self.submit_error = None;
        self.submit_in_flight = false;
        self.countdown = 0;
        self.step = WizardStep::Closed;
        self.bus.publish(AgentEvent::WizardClosed);
    }

    pub fn toggle(&mut self) {
        if self.step.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    // ---- field read-back ----

    pub fn set_title(&mut self, title: &str) {
        self.draft.title = title.to_string();
    }

    pub fn set_description(&mut self, description: &str) {
        self.draft.description = description.to_string();
    }

    pub fn set_severity(&mut self, severity: Severity) {
        self.draft.severity = severity;
    }

    pub fn set_selected_log_ids(&mut self, ids: Vec<usize>) {
        self.draft.selected_log_ids = ids;
    }

    pub fn set_text_field_focused(&mut self, focused: bool) {
        self.text_field_focused = focused;
    }

    // ---- transitions ----

    pub fn select_type(&mut self, report_type: ReportType) {
        if self.step != WizardStep::TypeSelect {
            return;
        }
        self.draft.report_type = report_type;
        self.set_step(WizardStep::Capture);
    }

    /// Advance to the next step. Returns whether a transition happened;
    /// `Details → Review` is gated on a non-empty title.
    pub fn advance(&mut self) -> bool {
        let next = match self.step {
            WizardStep::TypeSelect => WizardStep::Capture,
            WizardStep::Capture => {
                let next = advance_from_capture(self.draft.screenshot.is_some());
                if next == WizardStep::Annotate {
                    self.enter_annotate();
                }
                next
            }
            WizardStep::Annotate => {
                self.commit_annotations();
                WizardStep::Details
            }
            WizardStep::Details => {
                if self.draft.title.trim().is_empty() {
                    return false;
                }
                WizardStep::Review
            }
            WizardStep::Closed | WizardStep::Review | WizardStep::Success => return false,
        };
        self.set_step(next);
        true
    }

    pub fn back(&mut self) {
        let previous = match self.step {
            WizardStep::Capture => WizardStep::TypeSelect,
            WizardStep::Annotate => {
                self.commit_annotations();
                WizardStep::Capture
            }
            WizardStep::Details => back_from_details(self.draft.screenshot.is_some()),
            WizardStep::Review => WizardStep::Details,
            WizardStep::Success => {
                // Navigating back into the wizard cancels the countdown.
                self.countdown = 0;
                WizardStep::Review
            }
            WizardStep::Closed | WizardStep::TypeSelect => return,
        };
        self.set_step(previous);
    }

    /// Proceed past capture without a screenshot.
    pub fn skip_capture(&mut self) {
        if self.step == WizardStep::Capture {
            self.advance();
        }
    }

    // ---- capture ----

    pub async fn capture_full_page(&mut self) {
        self.run_capture(CaptureRequest::FullPage).await;
    }

    pub async fn capture_area(&mut self, rect: Rect) {
        if !area_qualifies(&rect) {
            debug!(?rect, "area below minimum size; ignoring");
            return;
        }
        self.run_capture(CaptureRequest::Area(rect)).await;
    }

    async fn run_capture(&mut self, request: CaptureRequest) {
        if self.step != WizardStep::Capture {
            return;
        }
        if !self.config.capture_enabled {
            self.set_step(WizardStep::Details);
            return;
        }
        match self.pipeline.run(self.host.as_ref(), request).await {
            CaptureOutcome::Captured(shot) => {
                self.draft.screenshot = Some(shot);
                // A new screenshot invalidates any earlier annotation
                // session; the canvas is rebuilt at the new resolution.
                self.canvas = None;
                self.draft.annotations.clear();
                self.enter_annotate();
                self.set_step(WizardStep::Annotate);
            }
            CaptureOutcome::Unavailable => {
                // Silent degradation: skip straight to details.
                self.set_step(WizardStep::Details);
            }
        }
    }

    // ---- element picking ----

    pub fn begin_element_picking(&mut self) -> AgentResult<()> {
        if self.step != WizardStep::Capture {
            return Ok(());
        }
        self.picker.activate()
    }

    pub fn picker_pointer_moved(&mut self, point: Point) {
        self.picker.pointer_moved(point);
    }

    pub fn picker_confirm(&mut self, point: Point) {
        self.picker.confirm_pick(point);
    }

    pub fn finish_element_picking(&mut self) {
        if self.is_picking() {
            let picks = self.picker.finish();
            self.draft.selected_elements.extend(picks);
        }
    }

    pub fn cancel_element_picking(&mut self) {
        if self.is_picking() {
            self.picker.cancel();
        }
    }

    // ---- area selection ----

    pub fn begin_area_selection(&mut self) {
        if self.step == WizardStep::Capture {
            self.area_active = true;
        }
    }

    pub fn area_pointer_down(&mut self, point: Point) {
        if self.area_active {
            self.area_anchor = Some(point);
        }
    }

    pub fn area_pointer_moved(&mut self, point: Point) {
        let Some(anchor) = self.area_anchor else {
            return;
        };
        let rect = span(anchor, point);
        match self.area_overlay {
            Some(node) => {
                let _ = self.host.update_overlay(node, rect);
            }
            None => {
                self.area_overlay = self
                    .host
                    .mount_overlay(OverlayNode::new(OverlayKind::AreaSelection, rect))
                    .ok();
            }
        }
    }

    /// Finish the drag. A qualifying rectangle starts the capture run;
    /// anything smaller is discarded as accidental.
    pub async fn area_pointer_up(&mut self, point: Point) {
        let Some(anchor) = self.area_anchor.take() else {
            return;
        };
        self.teardown_area_overlay();
        self.area_active = false;
        self.capture_area(span(anchor, point)).await;
    }

    /// Synchronous teardown; no transient node survives a cancel.
    pub fn cancel_area_selection(&mut self) {
        self.area_anchor = None;
        self.area_active = false;
        self.teardown_area_overlay();
    }

    fn teardown_area_overlay(&mut self) {
        if let Some(node) = self.area_overlay.take() {
            let _ = self.host.remove_overlay(node);
        }
    }

    // ---- annotation ----

    pub fn canvas_mut(&mut self) -> Option<&mut AnnotationCanvas> {
        self.canvas.as_mut()
    }

    pub fn add_text_annotation(&mut self, at: Point) {
        let host = self.host.clone();
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.add_text(host.as_ref(), at);
        }
    }

    // ---- submission ----

    /// Assemble and submit the report. On success the wizard advances to
    /// `Success` and starts the auto-close countdown; on failure it
    /// stays on `Review` with the draft intact and an inline error.
    pub async fn submit(&mut self) {
        if self.step != WizardStep::Review {
            return;
        }
        if self.submit_in_flight {
            warn!("submit already in flight; ignoring");
            return;
        }
        self.submit_in_flight = true;
        self.submit_error = None;

        let report = self.assemble();
        let result = match self.hooks.apply_before(report) {
            Ok(report) => self.sink.submit(&report).await,
            Err(err) => Err(err),
        };
        self.submit_in_flight = false;

        match result {
            Ok(ack) => {
                self.hooks.notify_success(&ack);
                self.bus.publish(AgentEvent::ReportSubmitted {
                    report_id: ack.id.clone(),
                });
                self.draft = DraftReport::default();
                self.canvas = None;
                self.countdown = SUCCESS_COUNTDOWN_TICKS;
                self.set_step(WizardStep::Success);
            }
            Err(err) => {
                self.hooks.notify_error(&err);
                self.bus.publish(AgentEvent::submit_failed(&err));
                self.submit_error = Some(err.to_string());
            }
        }
    }

    /// One tick of the auto-close countdown; at zero the wizard closes.
    pub fn tick_countdown(&mut self) {
        if self.step != WizardStep::Success {
            return;
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.close();
        }
    }

    // ---- keyboard ----

    /// Global keyboard contract. All shortcuts are suppressed while a
    /// text field has focus. Escape cancels the innermost active
    /// sub-mode first: element picking, then area selection, then the
    /// wizard itself.
    pub fn key_pressed(&mut self, key: Key) -> KeyAction {
        if self.text_field_focused {
            return KeyAction::None;
        }
        match key {
            Key::Escape => {
                if self.is_picking() {
                    self.cancel_element_picking();
                } else if self.area_active {
                    self.cancel_area_selection();
                } else {
                    self.close();
                }
            }
            Key::Enter => {
                if self.is_picking() {
                    self.finish_element_picking();
                } else if self.step == WizardStep::Success {
                    self.close();
                } else {
                    self.advance();
                }
            }
            Key::Digit(n) => return self.digit_pressed(n),
        }
        KeyAction::None
    }

    fn digit_pressed(&mut self, n: u8) -> KeyAction {
        match self.step {
            WizardStep::TypeSelect => {
                let report_type = match n {
                    1 => ReportType::Bug,
                    2 => ReportType::Improvement,
                    3 => ReportType::Question,
                    _ => return KeyAction::None,
                };
                self.select_type(report_type);
            }
            WizardStep::Capture => match n {
                1 => return KeyAction::StartFullCapture,
                2 => self.begin_area_selection(),
                3 => {
                    let _ = self.begin_element_picking();
                }
                _ => {}
            },
            _ => {}
        }
        KeyAction::None
    }

    // ---- view ----

    /// Pure per-step view description.
    pub fn view(&self) -> StepView {
        match self.step {
            WizardStep::Closed => StepView::Closed,
            WizardStep::TypeSelect => StepView::TypeSelect {
                selected: self.draft.report_type,
            },
            WizardStep::Capture => StepView::Capture {
                capture_enabled: self.config.capture_enabled,
                pick_count: self.draft.selected_elements.len() + self.picker.count(),
                has_screenshot: self.draft.screenshot.is_some(),
                picking: self.is_picking(),
                area_selection_active: self.area_active,
            },
            WizardStep::Annotate => StepView::Annotate {
                annotation_count: self
                    .canvas
                    .as_ref()
                    .map(|c| c.annotations().len())
                    .unwrap_or_default(),
                color: crate::annotate::DEFAULT_COLOR.to_string(),
            },
            WizardStep::Details => StepView::Details {
                title: self.draft.title.clone(),
                description: self.draft.description.clone(),
                severity: self.draft.severity,
                can_advance: !self.draft.title.trim().is_empty(),
            },
            WizardStep::Review => StepView::Review {
                report_type: self.draft.report_type,
                title: self.draft.title.clone(),
                severity: self.draft.severity,
                element_count: self.draft.selected_elements.len(),
                has_screenshot: self.draft.screenshot.is_some(),
                console_log_count: self.console.lock().expect("recorder lock").snapshot().len(),
                network_log_count: self.network.lock().expect("recorder lock").snapshot().len(),
                submitting: self.submit_in_flight,
                submit_error: self.submit_error.clone(),
            },
            WizardStep::Success => StepView::Success {
                countdown: self.countdown,
            },
        }
    }

    // ---- internals ----

    fn set_step(&mut self, step: WizardStep) {
        self.step = step;
        self.bus.publish(AgentEvent::StepChanged(step));
    }

    fn enter_annotate(&mut self) {
        if self.canvas.is_some() {
            return;
        }
        let Some(shot) = &self.draft.screenshot else {
            return;
        };
        let dpr = self.host.screen().device_pixel_ratio.max(0.5);
        let native = Size::new(shot.width as f64, shot.height as f64);
        let displayed = Size::new(native.width / dpr, native.height / dpr);
        self.canvas = Some(AnnotationCanvas::new(displayed, native));
    }

    fn commit_annotations(&mut self) {
        if let Some(canvas) = &self.canvas {
            self.draft.annotations = canvas.annotations().to_vec();
        }
    }

    fn assemble(&self) -> SubmittedReport {
        let console_snapshot = self.console.lock().expect("recorder lock").snapshot();
        let console_logs = if self.draft.selected_log_ids.is_empty() {
            console_snapshot
        } else {
            self.draft
                .selected_log_ids
                .iter()
                .filter_map(|&idx| console_snapshot.get(idx).cloned())
                .collect()
        };
        SubmittedReport {
            report_type: self.draft.report_type,
            title: self.draft.title.clone(),
            description: self.draft.description.clone(),
            severity: self.draft.severity,
            selected_elements: self.draft.selected_elements.clone(),
            screenshot: self.draft.screenshot.clone(),
            annotations: self.draft.annotations.clone(),
            console_logs,
            network_logs: self.network.lock().expect("recorder lock").snapshot(),
            environment: EnvironmentSnapshot::capture(self.host.as_ref()),
            session_id: self.session_id.clone(),
            submitted_at: now_rfc3339(),
            metadata: self.config.metadata.clone(),
            user_id: self.config.user_id.clone(),
        }
    }
}

fn span(a: Point, b: Point) -> Rect {
    Rect::new(
        a.x.min(b.x),
        a.y.min(b.y),
        (b.x - a.x).abs(),
        (b.y - a.y).abs(),
    )
}
