//! Screenshot capture as an ordered chain of fallback strategies.

pub mod pipeline;
pub mod strategy;

use serde::{Deserialize, Serialize};

use crate::host::Frame;
use crate::types::Rect;

pub use pipeline::CapturePipeline;
pub use strategy::{CaptureStrategy, DisplayFrameStrategy, RasterizeStrategy};

/// Minimum side length of a user-dragged capture area, in logical
/// pixels. Smaller drags are discarded as accidental.
pub const MIN_AREA_SIDE: f64 = 20.0;

/// Delay observed after hiding the agent UI, before the first capture
/// stage runs, so the page has repainted without the agent's chrome.
pub const SETTLE_DELAY_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureRequest {
    FullPage,
    /// User-dragged rectangle in logical viewport coordinates.
    Area(Rect),
}

/// A captured, encoded screenshot at native (device-pixel) resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub data: Vec<u8>,
}

impl Screenshot {
    pub fn from_frame(frame: Frame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            format: "png".to_string(),
            data: frame.data,
        }
    }
}

/// Result of running the pipeline: either a screenshot or a graceful
/// degradation signal (the wizard skips the annotation step).
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Captured(Screenshot),
    Unavailable,
}

/// Whether a dragged area is large enough to qualify as intentional.
pub fn area_qualifies(rect: &Rect) -> bool {
    rect.width >= MIN_AREA_SIDE && rect.height >= MIN_AREA_SIDE
}
