use std::sync::Arc;

use async_trait::async_trait;

use crate::dom::{Dom, NodeId};
use crate::error::{AgentError, AgentResult};
use crate::types::Rect;

use super::types::{
    Frame, NavigationState, OverlayNode, ScreenState, SharedConsoleTap, SharedNetworkTap,
};

fn not_supported(what: &str) -> AgentError {
    AgentError::NotSupported(what.to_string())
}

/// The live page the agent is embedded in.
///
/// Every method has a default body so embedders implement only what
/// their surface supports; unimplemented capabilities degrade per the
/// capture fallback chain or are reported at call time.
#[async_trait]
pub trait Host: Send + Sync {
    fn id(&self) -> &str {
        "unsupported"
    }

    // Page identity and environment.
    fn navigation(&self) -> NavigationState {
        NavigationState::default()
    }
    fn user_agent(&self) -> String {
        String::new()
    }
    fn screen(&self) -> ScreenState {
        ScreenState::default()
    }
    fn locale(&self) -> String {
        String::new()
    }
    fn timezone(&self) -> String {
        String::new()
    }
    fn cookies_enabled(&self) -> bool {
        false
    }
    fn do_not_track(&self) -> bool {
        false
    }

    // Console interception. The host invokes the installed tap on every
    // logging call and page fault, then performs its original behavior
    // unchanged. At most one tap may be installed at a time.
    fn install_console_tap(&self, _tap: SharedConsoleTap) -> AgentResult<()> {
        Err(not_supported("install_console_tap"))
    }
    fn remove_console_tap(&self) -> AgentResult<()> {
        Err(not_supported("remove_console_tap"))
    }

    // Network interception, same single-tap contract. Both the
    // promise-style and the event-style request primitive route through
    // the installed tap.
    fn install_network_tap(&self, _tap: SharedNetworkTap) -> AgentResult<()> {
        Err(not_supported("install_network_tap"))
    }
    fn remove_network_tap(&self) -> AgentResult<()> {
        Err(not_supported("remove_network_tap"))
    }

    // Document access.
    fn dom(&self) -> &dyn Dom;

    // Agent UI layer.
    fn mount_overlay(&self, _node: OverlayNode) -> AgentResult<NodeId> {
        Err(not_supported("mount_overlay"))
    }
    fn update_overlay(&self, _id: NodeId, _rect: Rect) -> AgentResult<()> {
        Err(not_supported("update_overlay"))
    }
    fn remove_overlay(&self, _id: NodeId) -> AgentResult<()> {
        Err(not_supported("remove_overlay"))
    }
    /// Whether the node belongs to the agent's own UI.
    fn is_agent_node(&self, _id: NodeId) -> bool {
        false
    }
    /// Hide or show the agent's own UI wholesale (used around capture).
    fn set_agent_ui_hidden(&self, _hidden: bool) {}
    /// Blocking text prompt shown to the user. `None` when unsupported
    /// or dismissed.
    fn prompt_text(&self, _message: &str) -> Option<String> {
        None
    }

    // Capture surfaces.
    /// One decoded frame of the live page surface at physical resolution.
    async fn capture_display_frame(&self) -> AgentResult<Frame> {
        Err(not_supported("capture_display_frame"))
    }
    /// DOM-to-raster reconstruction of the document. The host excludes
    /// agent-mounted overlay nodes from the render.
    async fn rasterize_document(&self) -> AgentResult<Frame> {
        Err(not_supported("rasterize_document"))
    }
}

pub type SharedHost = Arc<dyn Host>;
