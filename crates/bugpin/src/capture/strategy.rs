use async_trait::async_trait;

use crate::error::AgentResult;
use crate::host::{Frame, Host};
use crate::types::Rect;

use super::{CaptureRequest, Screenshot};

/// One stage of the capture fallback chain.
#[async_trait]
pub trait CaptureStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn capture(&self, host: &dyn Host, request: &CaptureRequest)
        -> AgentResult<Screenshot>;
}

/// High-fidelity stage: one decoded frame of the live page surface.
///
/// The captured frame is at physical resolution; for area capture the
/// requested region is scaled by the ratio of frame resolution to
/// logical viewport resolution before cropping.
pub struct DisplayFrameStrategy;

#[async_trait]
impl CaptureStrategy for DisplayFrameStrategy {
    fn name(&self) -> &'static str {
        "display-frame"
    }

    async fn capture(
        &self,
        host: &dyn Host,
        request: &CaptureRequest,
    ) -> AgentResult<Screenshot> {
        let frame = host.capture_display_frame().await?;
        Ok(finish(host, frame, request))
    }
}

/// Rasterization stage: DOM-to-raster reconstruction of the document.
/// The host excludes the agent's own overlay nodes from the render.
pub struct RasterizeStrategy;

#[async_trait]
impl CaptureStrategy for RasterizeStrategy {
    fn name(&self) -> &'static str {
        "rasterize"
    }

    async fn capture(
        &self,
        host: &dyn Host,
        request: &CaptureRequest,
    ) -> AgentResult<Screenshot> {
        let frame = host.rasterize_document().await?;
        Ok(finish(host, frame, request))
    }
}

fn finish(host: &dyn Host, frame: Frame, request: &CaptureRequest) -> Screenshot {
    match request {
        CaptureRequest::FullPage => Screenshot::from_frame(frame),
        CaptureRequest::Area(rect) => Screenshot::from_frame(crop_scaled(frame, rect, host)),
    }
}

/// Crop a logical-coordinate region out of a frame whose resolution may
/// differ from the viewport's.
fn crop_scaled(frame: Frame, rect: &Rect, host: &dyn Host) -> Frame {
    let screen = host.screen();
    let sx = if screen.viewport_width > 0 {
        frame.width as f64 / screen.viewport_width as f64
    } else {
        1.0
    };
    let sy = if screen.viewport_height > 0 {
        frame.height as f64 / screen.viewport_height as f64
    } else {
        1.0
    };
    frame.crop(
        (rect.x * sx).round() as u32,
        (rect.y * sy).round() as u32,
        (rect.width * sx).round() as u32,
        (rect.height * sy).round() as u32,
    )
}
