//! Interactive element selection with live highlight and numbered
//! badges, plus the selector/XPath builders.

pub mod selector;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::NodeId;
use crate::error::AgentResult;
use crate::host::{OverlayKind, OverlayNode, SharedHost};
use crate::record::truncate;
use crate::types::{Point, Rect};

/// Maximum number of elements one picking session may select.
pub const MAX_PICKS: usize = 10;
/// Stored length limits for element snippets.
pub const TEXT_SNIPPET_LEN: usize = 50;
pub const HTML_SNIPPET_LEN: usize = 300;

/// A picked element. The bounding box is a point-in-time snapshot taken
/// at pick time, not live-tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedElement {
    pub selector: String,
    pub xpath: String,
    pub tag_name: String,
    pub text_snippet: String,
    pub html_snippet: String,
    pub bounding_box: Rect,
    pub annotation_hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
    Inactive,
    Picking,
}

/// One element-picking session, scoped to one draft report.
pub struct ElementPicker {
    host: SharedHost,
    state: PickerState,
    picks: Vec<SelectedElement>,
    instruction: Option<NodeId>,
    highlight: Option<NodeId>,
    badges: Vec<NodeId>,
}

impl ElementPicker {
    pub fn new(host: SharedHost) -> Self {
        Self {
            host,
            state: PickerState::Inactive,
            picks: Vec::new(),
            instruction: None,
            highlight: None,
            badges: Vec::new(),
        }
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn count(&self) -> usize {
        self.picks.len()
    }

    /// Enter picking mode: the wizard UI hides and the floating
    /// instruction affordance appears with a live count.
    pub fn activate(&mut self) -> AgentResult<()> {
        if self.state == PickerState::Picking {
            return Ok(());
        }
        self.host.set_agent_ui_hidden(true);
        self.mount_instruction()?;
        self.state = PickerState::Picking;
        Ok(())
    }

    /// Track the pointer: highlight the element under it unless it
    /// belongs to the agent's own UI. Checked on every move.
    pub fn pointer_moved(&mut self, point: Point) {
        if self.state != PickerState::Picking {
            return;
        }
        let target = self
            .host
            .dom()
            .element_at(point)
            .filter(|&id| !self.host.is_agent_node(id));
        match target {
            Some(id) => {
                let rect = self.host.dom().bounding_box(id);
                match self.highlight {
                    Some(node) => {
                        let _ = self.host.update_overlay(node, rect);
                    }
                    None => {
                        self.highlight = self
                            .host
                            .mount_overlay(OverlayNode::new(OverlayKind::PickHighlight, rect))
                            .ok();
                    }
                }
            }
            None => self.clear_highlight(),
        }
    }

    /// Confirm a pick at the given point. Ignored when the session is
    /// already at the cap, when nothing is under the pointer, or when
    /// the target is agent UI.
    pub fn confirm_pick(&mut self, point: Point) -> Option<&SelectedElement> {
        if self.state != PickerState::Picking {
            return None;
        }
        if self.picks.len() >= MAX_PICKS {
            debug!("pick cap reached; ignoring");
            return None;
        }
        let dom = self.host.dom();
        let id = dom.element_at(point)?;
        if self.host.is_agent_node(id) {
            return None;
        }

        let bounds = dom.bounding_box(id);
        let tag_name = dom.tag_name(id);
        let text_snippet = truncate(dom.text_content(id).trim(), TEXT_SNIPPET_LEN);
        let ordinal = self.picks.len() + 1;
        let annotation_hint = if text_snippet.is_empty() {
            format!("Element {ordinal}: <{tag_name}>")
        } else {
            format!("Element {ordinal}: <{tag_name}> \u{201c}{text_snippet}\u{201d}")
        };
        let element = SelectedElement {
            selector: selector::css_selector(dom, id),
            xpath: selector::xpath(dom, id),
            tag_name,
            text_snippet,
            html_snippet: truncate(&dom.outer_html(id), HTML_SNIPPET_LEN),
            bounding_box: bounds,
            annotation_hint,
        };
        self.picks.push(element);

        let badge_rect = Rect::new(bounds.x + bounds.width - 12.0, bounds.y - 12.0, 24.0, 24.0);
        if let Ok(badge) = self.host.mount_overlay(
            OverlayNode::new(OverlayKind::PickBadge, badge_rect).with_label(ordinal.to_string()),
        ) {
            self.badges.push(badge);
        }
        // Refresh the live count in the instruction affordance.
        let _ = self.remount_instruction();
        self.picks.last()
    }

    /// Exit picking mode and hand the picks back to the wizard.
    pub fn finish(&mut self) -> Vec<SelectedElement> {
        self.teardown();
        std::mem::take(&mut self.picks)
    }

    /// Exit picking mode discarding every pick made in this session.
    /// Teardown is synchronous; no transient node survives.
    pub fn cancel(&mut self) {
        self.teardown();
        self.picks.clear();
    }

    fn teardown(&mut self) {
        if let Some(node) = self.instruction.take() {
            let _ = self.host.remove_overlay(node);
        }
        self.clear_highlight();
        for badge in self.badges.drain(..) {
            let _ = self.host.remove_overlay(badge);
        }
        self.host.set_agent_ui_hidden(false);
        self.state = PickerState::Inactive;
    }

    fn clear_highlight(&mut self) {
        if let Some(node) = self.highlight.take() {
            let _ = self.host.remove_overlay(node);
        }
    }

    fn instruction_label(&self) -> String {
        format!(
            "Click elements to select ({}/{MAX_PICKS}) — Enter to finish, Esc to cancel",
            self.picks.len()
        )
    }

    fn mount_instruction(&mut self) -> AgentResult<()> {
        let viewport = self.host.screen().viewport_width as f64;
        let rect = Rect::new(viewport / 2.0 - 160.0, 16.0, 320.0, 40.0);
        let node = self.host.mount_overlay(
            OverlayNode::new(OverlayKind::PickInstruction, rect).with_label(self.instruction_label()),
        )?;
        self.instruction = Some(node);
        Ok(())
    }

    fn remount_instruction(&mut self) -> AgentResult<()> {
        if let Some(node) = self.instruction.take() {
            self.host.remove_overlay(node)?;
        }
        self.mount_instruction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Dom;
    use crate::host::sim::{Elem, SimDom, SimHost};
    use crate::host::Host;
    use std::sync::Arc;

    fn host_with_button() -> (Arc<SimHost>, NodeId) {
        let dom = SimDom::new();
        let button = dom.insert(
            dom.body(),
            Elem::new("button")
                .classes(["primary"])
                .text("Save")
                .bounds(Rect::new(100.0, 100.0, 80.0, 30.0)),
        );
        (Arc::new(SimHost::new(dom)), button)
    }

    #[test]
    fn activate_shows_instruction_and_hides_ui() {
        let (host, _) = host_with_button();
        let mut picker = ElementPicker::new(host.clone());
        picker.activate().unwrap();
        assert_eq!(picker.state(), PickerState::Picking);
        assert!(host.ui_hidden());
        assert_eq!(host.overlays_of_kind(OverlayKind::PickInstruction).len(), 1);
    }

    #[test]
    fn confirm_pick_records_element_and_badge() {
        let (host, _) = host_with_button();
        let mut picker = ElementPicker::new(host.clone());
        picker.activate().unwrap();

        let picked = picker.confirm_pick(Point::new(120.0, 110.0)).cloned();
        let picked = picked.expect("pick");
        assert_eq!(picked.tag_name, "button");
        assert_eq!(picked.text_snippet, "Save");
        assert_eq!(picked.selector, "button.primary");
        assert!(picked.annotation_hint.starts_with("Element 1:"));
        assert_eq!(host.overlays_of_kind(OverlayKind::PickBadge).len(), 1);

        let instruction = &host.overlays_of_kind(OverlayKind::PickInstruction)[0].1;
        assert!(instruction.label.as_ref().unwrap().contains("(1/10)"));
    }

    #[test]
    fn picks_beyond_cap_are_ignored() {
        let dom = SimDom::new();
        for n in 0..12 {
            dom.insert(
                dom.body(),
                Elem::new("li").bounds(Rect::new(0.0, n as f64 * 20.0, 100.0, 20.0)),
            );
        }
        let host = Arc::new(SimHost::new(dom));
        let mut picker = ElementPicker::new(host.clone());
        picker.activate().unwrap();

        for n in 0..12 {
            picker.confirm_pick(Point::new(50.0, n as f64 * 20.0 + 5.0));
        }
        assert_eq!(picker.count(), MAX_PICKS);
        assert_eq!(host.overlays_of_kind(OverlayKind::PickBadge).len(), MAX_PICKS);
    }

    #[test]
    fn agent_ui_is_excluded_from_picking() {
        let (host, _) = host_with_button();
        // An agent overlay covering the button.
        host.mount_overlay(OverlayNode::new(
            OverlayKind::WizardPanel,
            Rect::new(90.0, 90.0, 200.0, 200.0),
        ))
        .unwrap();
        let mut picker = ElementPicker::new(host.clone());
        picker.activate().unwrap();

        // The overlay is deepest at this point; the pick must be ignored.
        assert!(picker.confirm_pick(Point::new(95.0, 95.0)).is_none());

        picker.pointer_moved(Point::new(95.0, 95.0));
        assert!(host.overlays_of_kind(OverlayKind::PickHighlight).is_empty());
    }

    #[test]
    fn pointer_moved_highlights_target() {
        let (host, button) = host_with_button();
        let mut picker = ElementPicker::new(host.clone());
        picker.activate().unwrap();

        picker.pointer_moved(Point::new(120.0, 110.0));
        let highlights = host.overlays_of_kind(OverlayKind::PickHighlight);
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].1.rect, host.dom().bounding_box(button));

        picker.pointer_moved(Point::new(900.0, 900.0));
        assert!(host.overlays_of_kind(OverlayKind::PickHighlight).is_empty());
    }

    #[test]
    fn finish_returns_picks_and_tears_down() {
        let (host, _) = host_with_button();
        let mut picker = ElementPicker::new(host.clone());
        picker.activate().unwrap();
        picker.confirm_pick(Point::new(120.0, 110.0));

        let picks = picker.finish();
        assert_eq!(picks.len(), 1);
        assert_eq!(picker.state(), PickerState::Inactive);
        assert_eq!(host.overlay_count(), 0);
        assert!(!host.ui_hidden());
    }

    #[test]
    fn cancel_discards_session_picks() {
        let (host, _) = host_with_button();
        let mut picker = ElementPicker::new(host.clone());
        picker.activate().unwrap();
        picker.confirm_pick(Point::new(120.0, 110.0));

        picker.cancel();
        assert_eq!(picker.count(), 0);
        assert_eq!(host.overlay_count(), 0);
        assert_eq!(picker.state(), PickerState::Inactive);
        // A later finish hands back nothing.
        assert!(picker.finish().is_empty());
    }
}
