use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::LogKind;
use crate::types::Rect;

/// Current location and document title of the host page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationState {
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// Screen and viewport geometry of the host page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenState {
    pub screen_width: u32,
    pub screen_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub device_pixel_ratio: f64,
}

impl Default for ScreenState {
    fn default() -> Self {
        Self {
            screen_width: 0,
            screen_height: 0,
            viewport_width: 0,
            viewport_height: 0,
            device_pixel_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    UncaughtError,
    UnhandledRejection,
}

/// An uncaught error or unhandled rejection signalled by the host page.
#[derive(Debug, Clone)]
pub struct PageFault {
    pub kind: FaultKind,
    pub message: String,
    pub stack: Option<String>,
}

/// Observer installed over the host's logging entry points.
///
/// The host invokes the tap first, then performs its original logging
/// behavior unchanged. The tap must not panic and must not log through
/// the host console.
pub trait ConsoleTap: Send + Sync {
    fn on_call(&self, kind: LogKind, args: &[Value]);
    fn on_fault(&self, fault: &PageFault);
}

/// How an intercepted network call settled.
#[derive(Debug, Clone)]
pub enum NetworkOutcome {
    Success { status: u16, status_text: String },
    Failure { error: String },
    /// The call ended without a status ever being set.
    Aborted,
}

/// Observer installed over both outbound request primitives.
///
/// `on_open` is invoked at call-open time and returns a token the host
/// passes back to `on_settle` at completion, success or not.
pub trait NetworkTap: Send + Sync {
    fn on_open(&self, method: &str, url: &str) -> u64;
    fn on_settle(&self, token: u64, outcome: NetworkOutcome);
}

pub type SharedConsoleTap = Arc<dyn ConsoleTap>;
pub type SharedNetworkTap = Arc<dyn NetworkTap>;

/// One decoded frame of the page surface, RGBA row-major at physical
/// (device-pixel) resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    /// A solid-color frame, used by hosts that synthesize capture output.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&rgba);
        }
        Self { width, height, data }
    }

    /// Extract a sub-region, clamped to the frame bounds.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Frame {
        let x = x.min(self.width);
        let y = y.min(self.height);
        let width = width.min(self.width - x);
        let height = height.min(self.height - y);
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for row in y..y + height {
            let start = ((row * self.width + x) * 4) as usize;
            let end = start + (width * 4) as usize;
            data.extend_from_slice(&self.data[start..end]);
        }
        Frame { width, height, data }
    }
}

/// Kinds of overlay node the agent mounts on its own UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Launcher,
    WizardPanel,
    PickInstruction,
    PickHighlight,
    PickBadge,
    AreaSelection,
    IncidentHighlight,
    IncidentBadge,
    IncidentPopup,
}

/// Description of an overlay node handed to the host for mounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayNode {
    pub kind: OverlayKind,
    pub rect: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl OverlayNode {
    pub fn new(kind: OverlayKind, rect: Rect) -> Self {
        Self { kind, rect, label: None }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_frame_has_expected_size() {
        let f = Frame::solid(4, 3, [1, 2, 3, 255]);
        assert_eq!(f.data.len(), 4 * 3 * 4);
        assert_eq!(&f.data[0..4], &[1, 2, 3, 255]);
    }

    #[test]
    fn crop_extracts_region() {
        let f = Frame::solid(10, 10, [9, 9, 9, 255]);
        let c = f.crop(2, 3, 4, 5);
        assert_eq!(c.width, 4);
        assert_eq!(c.height, 5);
        assert_eq!(c.data.len(), 4 * 5 * 4);
    }

    #[test]
    fn crop_clamps_to_bounds() {
        let f = Frame::solid(8, 8, [0, 0, 0, 0]);
        let c = f.crop(6, 6, 10, 10);
        assert_eq!(c.width, 2);
        assert_eq!(c.height, 2);
    }
}
