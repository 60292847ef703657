use std::time::Duration;

use tracing::debug;

use crate::host::Host;

use super::strategy::{CaptureStrategy, DisplayFrameStrategy, RasterizeStrategy};
use super::{CaptureOutcome, CaptureRequest, SETTLE_DELAY_MS};

/// Ordered chain of capture strategies, tried first-success-wins.
///
/// The agent's own UI is hidden for the duration of the run, with a
/// short settle delay before the first stage; the high-fidelity stage
/// would otherwise capture the agent's own chrome.
pub struct CapturePipeline {
    strategies: Vec<Box<dyn CaptureStrategy>>,
}

impl CapturePipeline {
    pub fn new(strategies: Vec<Box<dyn CaptureStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard chain: live display frame, then DOM rasterization.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(DisplayFrameStrategy),
            Box::new(RasterizeStrategy),
        ])
    }

    pub async fn run(&self, host: &dyn Host, request: CaptureRequest) -> CaptureOutcome {
        host.set_agent_ui_hidden(true);
        tokio::time::sleep(Duration::from_millis(SETTLE_DELAY_MS)).await;

        let mut outcome = CaptureOutcome::Unavailable;
        for strategy in &self.strategies {
            match strategy.capture(host, &request).await {
                Ok(screenshot) => {
                    outcome = CaptureOutcome::Captured(screenshot);
                    break;
                }
                Err(err) => {
                    debug!(stage = strategy.name(), %err, "capture stage failed; falling through");
                }
            }
        }

        host.set_agent_ui_hidden(false);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::SimHost;
    use crate::host::Frame;

    #[tokio::test(start_paused = true)]
    async fn first_stage_wins_when_it_succeeds() {
        let host = SimHost::default();
        host.set_display_frame(Some(Frame::solid(10, 10, [0, 0, 0, 255])));
        host.set_raster_frame(Some(Frame::solid(20, 20, [0, 0, 0, 255])));

        let outcome = CapturePipeline::standard()
            .run(&host, CaptureRequest::FullPage)
            .await;
        match outcome {
            CaptureOutcome::Captured(shot) => assert_eq!(shot.width, 10),
            CaptureOutcome::Unavailable => panic!("expected capture"),
        }
        assert_eq!(host.capture_calls(), vec!["display hidden=true"]);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_through_to_rasterization() {
        let host = SimHost::default();
        host.set_raster_frame(Some(Frame::solid(20, 20, [0, 0, 0, 255])));

        let outcome = CapturePipeline::standard()
            .run(&host, CaptureRequest::FullPage)
            .await;
        assert!(matches!(outcome, CaptureOutcome::Captured(ref s) if s.width == 20));
        assert_eq!(
            host.capture_calls(),
            vec!["display hidden=true", "raster hidden=true"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_degrades_gracefully() {
        let host = SimHost::default();
        let outcome = CapturePipeline::standard()
            .run(&host, CaptureRequest::FullPage)
            .await;
        assert_eq!(outcome, CaptureOutcome::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn agent_ui_is_restored_after_run() {
        let host = SimHost::default();
        let _ = CapturePipeline::standard()
            .run(&host, CaptureRequest::FullPage)
            .await;
        assert!(!host.ui_hidden());
    }
}
