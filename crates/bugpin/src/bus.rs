use tokio::sync::broadcast;

use crate::error::AgentError;
use crate::wizard::WizardStep;

/// Events the agent publishes for embedders to observe.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    WizardOpened,
    WizardClosed,
    StepChanged(WizardStep),
    ReportSubmitted { report_id: Option<String> },
    SubmitFailed(String),
    OverlaysReconciled { visible: usize },
}

impl AgentEvent {
    pub fn submit_failed(err: &AgentError) -> Self {
        AgentEvent::SubmitFailed(err.to_string())
    }
}

#[derive(Clone)]
pub struct Bus {
    sender: broadcast::Sender<AgentEvent>,
}

impl Bus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    /// Send to all current subscribers. Lagging or absent subscribers
    /// never block the agent.
    pub fn publish(&self, event: AgentEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn publish_and_receive_event() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(AgentEvent::WizardOpened);

        let received = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("timeout")
            .expect("recv");
        assert!(matches!(received, AgentEvent::WizardOpened));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_event() {
        let bus = Bus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(AgentEvent::OverlaysReconciled { visible: 3 });

        assert!(matches!(
            rx1.recv().await.expect("recv1"),
            AgentEvent::OverlaysReconciled { visible: 3 }
        ));
        assert!(matches!(
            rx2.recv().await.expect("recv2"),
            AgentEvent::OverlaysReconciled { visible: 3 }
        ));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let bus = Bus::default();
        bus.publish(AgentEvent::WizardClosed);
    }
}
