//! In-memory host used by the test suite and by embedders that want a
//! reference adapter. The page surface, console, network primitives and
//! capture stages are all scriptable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::dom::{Dom, NodeId};
use crate::error::{AgentError, AgentResult};
use crate::record::LogKind;
use crate::types::{Point, Rect};

use super::types::{
    Frame, NavigationState, NetworkOutcome, OverlayKind, OverlayNode, PageFault, ScreenState,
    SharedConsoleTap, SharedNetworkTap,
};

/// Descriptor for an element inserted into a [`SimDom`].
#[derive(Debug, Clone, Default)]
pub struct Elem {
    tag: String,
    id_attr: Option<String>,
    classes: Vec<String>,
    text: String,
    bounds: Rect,
    hidden: bool,
}

impl Elem {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            bounds: Rect::new(0.0, 0.0, 0.0, 0.0),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id_attr = Some(id.to_string());
        self
    }

    pub fn classes<I: IntoIterator<Item = S>, S: Into<String>>(mut self, classes: I) -> Self {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn bounds(mut self, rect: Rect) -> Self {
        self.bounds = rect;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

struct SimNode {
    elem: Elem,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct DomInner {
    nodes: HashMap<NodeId, SimNode>,
    root: NodeId,
    body: NodeId,
    extent: Rect,
}

/// Scriptable in-memory document tree.
pub struct SimDom {
    inner: RwLock<DomInner>,
    next_id: AtomicU64,
}

impl SimDom {
    /// A fresh document with `html` root and an empty `body`.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            1,
            SimNode {
                elem: Elem::new("html"),
                parent: None,
                children: vec![2],
            },
        );
        nodes.insert(
            2,
            SimNode {
                elem: Elem::new("body"),
                parent: Some(1),
                children: Vec::new(),
            },
        );
        Self {
            inner: RwLock::new(DomInner {
                nodes,
                root: 1,
                body: 2,
                extent: Rect::new(0.0, 0.0, 1280.0, 2000.0),
            }),
            next_id: AtomicU64::new(3),
        }
    }

    /// Insert an element under `parent`, returning its node id.
    pub fn insert(&self, parent: NodeId, elem: Elem) -> NodeId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.write().expect("dom lock");
        inner.nodes.insert(
            id,
            SimNode {
                elem,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        if let Some(p) = inner.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        id
    }

    /// Remove an element and its subtree.
    pub fn remove(&self, id: NodeId) {
        let mut inner = self.inner.write().expect("dom lock");
        remove_subtree(&mut inner.nodes, id);
    }

    pub fn set_bounds(&self, id: NodeId, rect: Rect) {
        let mut inner = self.inner.write().expect("dom lock");
        if let Some(node) = inner.nodes.get_mut(&id) {
            node.elem.bounds = rect;
        }
    }

    pub fn set_hidden(&self, id: NodeId, hidden: bool) {
        let mut inner = self.inner.write().expect("dom lock");
        if let Some(node) = inner.nodes.get_mut(&id) {
            node.elem.hidden = hidden;
        }
    }

    pub fn set_extent(&self, extent: Rect) {
        self.inner.write().expect("dom lock").extent = extent;
    }

    fn depth(&self, id: NodeId) -> usize {
        let inner = self.inner.read().expect("dom lock");
        let mut depth = 0;
        let mut current = id;
        while let Some(node) = inner.nodes.get(&current) {
            match node.parent {
                Some(p) => {
                    depth += 1;
                    current = p;
                }
                None => break,
            }
        }
        depth
    }
}

fn remove_subtree(nodes: &mut HashMap<NodeId, SimNode>, id: NodeId) {
    let children = match nodes.remove(&id) {
        Some(node) => {
            if let Some(parent) = node.parent.and_then(|p| nodes.get_mut(&p)) {
                parent.children.retain(|&c| c != id);
            }
            node.children
        }
        None => return,
    };
    for child in children {
        remove_subtree(nodes, child);
    }
}

impl Default for SimDom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom for SimDom {
    fn root(&self) -> NodeId {
        self.inner.read().expect("dom lock").root
    }

    fn body(&self) -> NodeId {
        self.inner.read().expect("dom lock").body
    }

    fn element_at(&self, point: Point) -> Option<NodeId> {
        let candidates: Vec<NodeId> = {
            let inner = self.inner.read().expect("dom lock");
            inner
                .nodes
                .iter()
                .filter(|(_, node)| !node.elem.hidden && node.elem.bounds.contains(point))
                .map(|(&id, _)| id)
                .collect()
        };
        candidates.into_iter().max_by_key(|&id| self.depth(id))
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let ids: Vec<NodeId> = {
            let inner = self.inner.read().expect("dom lock");
            if let Some(id_attr) = selector.strip_prefix('#') {
                return inner
                    .nodes
                    .iter()
                    .find(|(_, n)| n.elem.id_attr.as_deref() == Some(id_attr))
                    .map(|(&id, _)| id);
            }
            let mut ids: Vec<NodeId> = inner.nodes.keys().copied().collect();
            ids.sort_unstable();
            ids
        };
        // Match by regenerating each element's canonical selector.
        ids.into_iter()
            .find(|&id| crate::picker::selector::css_selector(self, id) == selector)
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner
            .read()
            .expect("dom lock")
            .nodes
            .get(&id)
            .and_then(|n| n.parent)
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.inner
            .read()
            .expect("dom lock")
            .nodes
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn tag_name(&self, id: NodeId) -> String {
        self.inner
            .read()
            .expect("dom lock")
            .nodes
            .get(&id)
            .map(|n| n.elem.tag.clone())
            .unwrap_or_default()
    }

    fn id_attr(&self, id: NodeId) -> Option<String> {
        self.inner
            .read()
            .expect("dom lock")
            .nodes
            .get(&id)
            .and_then(|n| n.elem.id_attr.clone())
            .filter(|s| !s.is_empty())
    }

    fn classes(&self, id: NodeId) -> Vec<String> {
        self.inner
            .read()
            .expect("dom lock")
            .nodes
            .get(&id)
            .map(|n| n.elem.classes.clone())
            .unwrap_or_default()
    }

    fn text_content(&self, id: NodeId) -> String {
        self.inner
            .read()
            .expect("dom lock")
            .nodes
            .get(&id)
            .map(|n| n.elem.text.clone())
            .unwrap_or_default()
    }

    fn outer_html(&self, id: NodeId) -> String {
        let inner = self.inner.read().expect("dom lock");
        match inner.nodes.get(&id) {
            Some(node) => {
                let mut open = format!("<{}", node.elem.tag);
                if let Some(id_attr) = &node.elem.id_attr {
                    open.push_str(&format!(" id=\"{id_attr}\""));
                }
                if !node.elem.classes.is_empty() {
                    open.push_str(&format!(" class=\"{}\"", node.elem.classes.join(" ")));
                }
                format!("{open}>{}</{}>", node.elem.text, node.elem.tag)
            }
            None => String::new(),
        }
    }

    fn bounding_box(&self, id: NodeId) -> Rect {
        self.inner
            .read()
            .expect("dom lock")
            .nodes
            .get(&id)
            .map(|n| n.elem.bounds)
            .unwrap_or_else(|| Rect::new(0.0, 0.0, 0.0, 0.0))
    }

    fn is_hidden(&self, id: NodeId) -> bool {
        self.inner
            .read()
            .expect("dom lock")
            .nodes
            .get(&id)
            .map(|n| n.elem.hidden)
            .unwrap_or(true)
    }

    fn document_extent(&self) -> Rect {
        self.inner.read().expect("dom lock").extent
    }
}

/// Scriptable in-memory host page.
pub struct SimHost {
    dom: SimDom,
    console_tap: Mutex<Option<SharedConsoleTap>>,
    network_tap: Mutex<Option<SharedNetworkTap>>,
    /// What the original console entry points produced. Lines keep
    /// arriving here whether or not a tap is installed; that is the
    /// transparency contract.
    printed: Mutex<Vec<String>>,
    overlays: Mutex<HashMap<NodeId, OverlayNode>>,
    overlays_mounted: AtomicU64,
    overlays_removed: AtomicU64,
    ui_hidden: AtomicBool,
    display_frame: Mutex<Option<Frame>>,
    raster_frame: Mutex<Option<Frame>>,
    capture_calls: Mutex<Vec<String>>,
    prompt_reply: Mutex<Option<String>>,
    nav: Mutex<NavigationState>,
    ua: Mutex<String>,
    screen: Mutex<ScreenState>,
    locale: Mutex<String>,
    timezone: Mutex<String>,
}

impl SimHost {
    pub fn new(dom: SimDom) -> Self {
        Self {
            dom,
            console_tap: Mutex::new(None),
            network_tap: Mutex::new(None),
            printed: Mutex::new(Vec::new()),
            overlays: Mutex::new(HashMap::new()),
            overlays_mounted: AtomicU64::new(0),
            overlays_removed: AtomicU64::new(0),
            ui_hidden: AtomicBool::new(false),
            display_frame: Mutex::new(None),
            raster_frame: Mutex::new(None),
            capture_calls: Mutex::new(Vec::new()),
            prompt_reply: Mutex::new(None),
            nav: Mutex::new(NavigationState {
                url: "https://app.example.com/dashboard".to_string(),
                title: "Dashboard".to_string(),
                referrer: None,
            }),
            ua: Mutex::new(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            screen: Mutex::new(ScreenState {
                screen_width: 1920,
                screen_height: 1080,
                viewport_width: 1280,
                viewport_height: 720,
                device_pixel_ratio: 1.0,
            }),
            locale: Mutex::new("en-US".to_string()),
            timezone: Mutex::new("UTC".to_string()),
        }
    }

    // ---- scripting surface used by tests and embedders ----

    pub fn set_url(&self, url: &str) {
        self.nav.lock().expect("lock").url = url.to_string();
    }

    pub fn set_title(&self, title: &str) {
        self.nav.lock().expect("lock").title = title.to_string();
    }

    pub fn set_user_agent(&self, ua: &str) {
        *self.ua.lock().expect("lock") = ua.to_string();
    }

    pub fn set_screen(&self, screen: ScreenState) {
        *self.screen.lock().expect("lock") = screen;
    }

    pub fn set_display_frame(&self, frame: Option<Frame>) {
        *self.display_frame.lock().expect("lock") = frame;
    }

    pub fn set_raster_frame(&self, frame: Option<Frame>) {
        *self.raster_frame.lock().expect("lock") = frame;
    }

    pub fn set_prompt_reply(&self, reply: Option<&str>) {
        *self.prompt_reply.lock().expect("lock") = reply.map(str::to_string);
    }

    /// The page calls one of its logging entry points.
    pub fn emit_console(&self, kind: LogKind, args: Vec<Value>) {
        if let Some(tap) = self.console_tap.lock().expect("lock").clone() {
            tap.on_call(kind, &args);
        }
        let joined = args
            .iter()
            .map(crate::record::stringify_arg)
            .collect::<Vec<_>>()
            .join(" ");
        self.printed.lock().expect("lock").push(format!("{kind}: {joined}"));
    }

    /// The page signals an uncaught error or unhandled rejection.
    pub fn emit_fault(&self, fault: PageFault) {
        if let Some(tap) = self.console_tap.lock().expect("lock").clone() {
            tap.on_fault(&fault);
        }
        self.printed
            .lock()
            .expect("lock")
            .push(format!("fault: {}", fault.message));
    }

    /// Drive the promise-style request primitive to completion.
    pub fn simulate_fetch(&self, method: &str, url: &str, outcome: NetworkOutcome) {
        if let Some(token) = self.begin_request(method, url) {
            self.settle_request(token, outcome);
        }
    }

    /// Event-style primitive, open phase. Returns the tap token when a
    /// tap is installed.
    pub fn begin_request(&self, method: &str, url: &str) -> Option<u64> {
        self.network_tap
            .lock()
            .expect("lock")
            .clone()
            .map(|tap| tap.on_open(method, url))
    }

    /// Event-style primitive, completion phase.
    pub fn settle_request(&self, token: u64, outcome: NetworkOutcome) {
        if let Some(tap) = self.network_tap.lock().expect("lock").clone() {
            tap.on_settle(token, outcome);
        }
    }

    pub fn printed_lines(&self) -> Vec<String> {
        self.printed.lock().expect("lock").clone()
    }

    pub fn console_tap_installed(&self) -> bool {
        self.console_tap.lock().expect("lock").is_some()
    }

    pub fn network_tap_installed(&self) -> bool {
        self.network_tap.lock().expect("lock").is_some()
    }

    pub fn sim_dom(&self) -> &SimDom {
        &self.dom
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.lock().expect("lock").len()
    }

    pub fn overlays_of_kind(&self, kind: OverlayKind) -> Vec<(NodeId, OverlayNode)> {
        self.overlays
            .lock()
            .expect("lock")
            .iter()
            .filter(|(_, n)| n.kind == kind)
            .map(|(&id, n)| (id, n.clone()))
            .collect()
    }

    /// Total overlays ever mounted / removed, for node-churn assertions.
    pub fn overlay_churn(&self) -> (u64, u64) {
        (
            self.overlays_mounted.load(Ordering::SeqCst),
            self.overlays_removed.load(Ordering::SeqCst),
        )
    }

    pub fn ui_hidden(&self) -> bool {
        self.ui_hidden.load(Ordering::SeqCst)
    }

    pub fn capture_calls(&self) -> Vec<String> {
        self.capture_calls.lock().expect("lock").clone()
    }
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new(SimDom::new())
    }
}

#[async_trait]
impl super::Host for SimHost {
    fn id(&self) -> &str {
        "sim"
    }

    fn navigation(&self) -> NavigationState {
        self.nav.lock().expect("lock").clone()
    }

    fn user_agent(&self) -> String {
        self.ua.lock().expect("lock").clone()
    }

    fn screen(&self) -> ScreenState {
        self.screen.lock().expect("lock").clone()
    }

    fn locale(&self) -> String {
        self.locale.lock().expect("lock").clone()
    }

    fn timezone(&self) -> String {
        self.timezone.lock().expect("lock").clone()
    }

    fn cookies_enabled(&self) -> bool {
        true
    }

    fn do_not_track(&self) -> bool {
        false
    }

    fn install_console_tap(&self, tap: SharedConsoleTap) -> AgentResult<()> {
        let mut slot = self.console_tap.lock().expect("lock");
        if slot.is_some() {
            return Err(AgentError::Internal("console tap already installed".into()));
        }
        *slot = Some(tap);
        Ok(())
    }

    fn remove_console_tap(&self) -> AgentResult<()> {
        *self.console_tap.lock().expect("lock") = None;
        Ok(())
    }

    fn install_network_tap(&self, tap: SharedNetworkTap) -> AgentResult<()> {
        let mut slot = self.network_tap.lock().expect("lock");
        if slot.is_some() {
            return Err(AgentError::Internal("network tap already installed".into()));
        }
        *slot = Some(tap);
        Ok(())
    }

    fn remove_network_tap(&self) -> AgentResult<()> {
        *self.network_tap.lock().expect("lock") = None;
        Ok(())
    }

    fn dom(&self) -> &dyn Dom {
        &self.dom
    }

    fn mount_overlay(&self, node: OverlayNode) -> AgentResult<NodeId> {
        // Overlays participate in hit-testing like real DOM nodes.
        let id = self.dom.insert(
            self.dom.body(),
            Elem::new("bugpin-overlay").bounds(node.rect),
        );
        self.overlays.lock().expect("lock").insert(id, node);
        self.overlays_mounted.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn update_overlay(&self, id: NodeId, rect: Rect) -> AgentResult<()> {
        let mut overlays = self.overlays.lock().expect("lock");
        match overlays.get_mut(&id) {
            Some(node) => {
                node.rect = rect;
                self.dom.set_bounds(id, rect);
                Ok(())
            }
            None => Err(AgentError::InvalidInput(format!("unknown overlay {id}"))),
        }
    }

    fn remove_overlay(&self, id: NodeId) -> AgentResult<()> {
        if self.overlays.lock().expect("lock").remove(&id).is_some() {
            self.dom.remove(id);
            self.overlays_removed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_agent_node(&self, id: NodeId) -> bool {
        self.overlays.lock().expect("lock").contains_key(&id)
    }

    fn set_agent_ui_hidden(&self, hidden: bool) {
        self.ui_hidden.store(hidden, Ordering::SeqCst);
    }

    fn prompt_text(&self, _message: &str) -> Option<String> {
        self.prompt_reply.lock().expect("lock").clone()
    }

    async fn capture_display_frame(&self) -> AgentResult<Frame> {
        self.capture_calls
            .lock()
            .expect("lock")
            .push(format!("display hidden={}", self.ui_hidden()));
        self.display_frame
            .lock()
            .expect("lock")
            .clone()
            .ok_or_else(|| AgentError::Capture("display capture unavailable".into()))
    }

    async fn rasterize_document(&self) -> AgentResult<Frame> {
        self.capture_calls
            .lock()
            .expect("lock")
            .push(format!("raster hidden={}", self.ui_hidden()));
        self.raster_frame
            .lock()
            .expect("lock")
            .clone()
            .ok_or_else(|| AgentError::Capture("rasterization unavailable".into()))
    }
}
