//! The embedding facade: one `Agent` per page load. `mount()` starts
//! the recorders, shows the launcher and spawns the background tasks;
//! `teardown()` releases every tap, task and overlay node.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bus::{AgentEvent, Bus};
use crate::config::AgentConfig;
use crate::dom::NodeId;
use crate::error::AgentResult;
use crate::fingerprint::SessionId;
use crate::host::{OverlayKind, OverlayNode, SharedHost};
use crate::incident::SharedIncidentSource;
use crate::overlay::OverlayReconciler;
use crate::recorder::{ConsoleRecorder, NetworkRecorder};
use crate::report::{SharedSink, SubmitHooks};
use crate::types::{Corner, Rect};
use crate::wizard::ReportWizard;

const LAUNCHER_SIZE: f64 = 48.0;
const LAUNCHER_MARGIN: f64 = 16.0;
const COUNTDOWN_TICK_MS: u64 = 1_000;

pub struct Agent {
    host: SharedHost,
    config: AgentConfig,
    bus: Bus,
    console: Arc<Mutex<ConsoleRecorder>>,
    network: Arc<Mutex<NetworkRecorder>>,
    wizard: Arc<tokio::sync::Mutex<ReportWizard>>,
    reconciler: Arc<tokio::sync::Mutex<OverlayReconciler>>,
    launcher: Option<NodeId>,
    mounted: bool,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Agent {
    /// Build the agent. A missing submission endpoint is fatal: the
    /// agent refuses to construct and nothing is mounted.
    pub fn new(
        host: SharedHost,
        config: AgentConfig,
        sink: SharedSink,
        source: SharedIncidentSource,
        hooks: SubmitHooks,
    ) -> AgentResult<Self> {
        config.validate()?;
        let bus = Bus::default();
        let session = SessionId::new();
        let console = Arc::new(Mutex::new(ConsoleRecorder::new(
            host.clone(),
            config.console_capacity,
        )));
        let network = Arc::new(Mutex::new(NetworkRecorder::new(
            host.clone(),
            config.network_capacity,
            &config.endpoint,
        )));
        let wizard = Arc::new(tokio::sync::Mutex::new(ReportWizard::new(
            host.clone(),
            config.clone(),
            sink,
            hooks,
            bus.clone(),
            console.clone(),
            network.clone(),
            session.get().to_string(),
        )));
        let reconciler = Arc::new(tokio::sync::Mutex::new(OverlayReconciler::new(
            host.clone(),
            source,
        )));
        Ok(Self {
            host,
            config,
            bus,
            console,
            network,
            wizard,
            reconciler,
            launcher: None,
            mounted: false,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        })
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AgentEvent> {
        self.bus.subscribe()
    }

    pub fn wizard(&self) -> Arc<tokio::sync::Mutex<ReportWizard>> {
        self.wizard.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Start recording, show the launcher and spawn the poll and
    /// countdown tasks. Called once per page load; a second call is a
    /// no-op with a diagnostic.
    pub fn mount(&mut self) -> AgentResult<()> {
        if self.mounted {
            warn!("agent already mounted; ignoring");
            return Ok(());
        }
        self.console.lock().expect("recorder lock").start()?;
        self.network.lock().expect("recorder lock").start()?;

        if self.config.show_launcher {
            self.launcher = self
                .host
                .mount_overlay(
                    OverlayNode::new(OverlayKind::Launcher, self.launcher_rect())
                        .with_label("Report an issue".to_string()),
                )
                .ok();
        }

        self.cancel = CancellationToken::new();
        self.spawn_poll_task();
        self.spawn_countdown_task();
        self.mounted = true;
        info!(endpoint = %self.config.endpoint, "agent mounted");
        Ok(())
    }

    /// Release everything `mount()` installed: taps, tasks, the wizard
    /// and every overlay node the agent owns.
    pub async fn teardown(&mut self) -> AgentResult<()> {
        if !self.mounted {
            return Ok(());
        }
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.wizard.lock().await.close();
        self.reconciler.lock().await.clear();
        if let Some(launcher) = self.launcher.take() {
            let _ = self.host.remove_overlay(launcher);
        }
        self.console.lock().expect("recorder lock").stop()?;
        self.network.lock().expect("recorder lock").stop()?;
        self.mounted = false;
        info!("agent torn down");
        Ok(())
    }

    /// The launcher click handler: toggles the wizard.
    pub async fn launcher_clicked(&self) {
        self.wizard.lock().await.toggle();
    }

    /// Run one reconciler cycle immediately, outside the poll schedule.
    pub async fn poll_incidents_now(&self) -> AgentResult<usize> {
        let visible = self.reconciler.lock().await.poll_once().await?;
        self.bus.publish(AgentEvent::OverlaysReconciled { visible });
        Ok(visible)
    }

    /// Scroll/resize handler: reposition incident overlays in place.
    pub async fn page_geometry_changed(&self) {
        self.reconciler.lock().await.reposition();
    }

    fn spawn_poll_task(&mut self) {
        let reconciler = self.reconciler.clone();
        let bus = self.bus.clone();
        let cancel = self.cancel.clone();
        let period = Duration::from_millis(self.config.poll_interval_ms.max(1));
        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        match reconciler.lock().await.poll_once().await {
                            Ok(visible) => {
                                bus.publish(AgentEvent::OverlaysReconciled { visible });
                            }
                            Err(err) => warn!(%err, "incident poll failed"),
                        }
                    }
                }
            }
        }));
    }

    fn spawn_countdown_task(&mut self) {
        let wizard = self.wizard.clone();
        let cancel = self.cancel.clone();
        self.tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(COUNTDOWN_TICK_MS));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => wizard.lock().await.tick_countdown(),
                }
            }
        }));
    }

    fn launcher_rect(&self) -> Rect {
        let screen = self.host.screen();
        let (vw, vh) = (
            screen.viewport_width as f64,
            screen.viewport_height as f64,
        );
        let far_x = vw - LAUNCHER_SIZE - LAUNCHER_MARGIN;
        let far_y = vh - LAUNCHER_SIZE - LAUNCHER_MARGIN;
        let (x, y) = match self.config.corner {
            Corner::TopLeft => (LAUNCHER_MARGIN, LAUNCHER_MARGIN),
            Corner::TopRight => (far_x, LAUNCHER_MARGIN),
            Corner::BottomLeft => (LAUNCHER_MARGIN, far_y),
            Corner::BottomRight => (far_x, far_y),
        };
        Rect::new(x, y, LAUNCHER_SIZE, LAUNCHER_SIZE)
    }
}
