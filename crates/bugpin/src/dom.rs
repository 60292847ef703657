//! Read-only view of the host page's document tree.

use crate::types::{Point, Rect};

/// Opaque handle to a live DOM node. Handles are host-scoped and stay
/// valid for the lifetime of the node they refer to.
pub type NodeId = u64;

/// Read-only structural queries against the host document.
///
/// The agent never mutates the host document through this trait; its own
/// UI goes through the host's overlay layer instead.
pub trait Dom: Send + Sync {
    /// The document root (`html`).
    fn root(&self) -> NodeId;
    /// The document body.
    fn body(&self) -> NodeId;
    /// The deepest visible element under the given point, if any.
    fn element_at(&self, point: Point) -> Option<NodeId>;
    /// Resolve a CSS selector to the first matching element.
    fn query_selector(&self, selector: &str) -> Option<NodeId>;
    fn parent(&self, id: NodeId) -> Option<NodeId>;
    fn children(&self, id: NodeId) -> Vec<NodeId>;
    /// Lowercase tag name.
    fn tag_name(&self, id: NodeId) -> String;
    /// The `id` attribute, if present and non-empty.
    fn id_attr(&self, id: NodeId) -> Option<String>;
    fn classes(&self, id: NodeId) -> Vec<String>;
    fn text_content(&self, id: NodeId) -> String;
    fn outer_html(&self, id: NodeId) -> String;
    /// Bounding box in logical page coordinates at call time.
    fn bounding_box(&self, id: NodeId) -> Rect;
    /// Whether the element is hidden via style (display/visibility).
    fn is_hidden(&self, id: NodeId) -> bool;
    /// The rendered extent of the whole document.
    fn document_extent(&self) -> Rect;
}

/// Whether an element is currently visible on the page: not hidden via
/// style, non-zero size, and at least partially inside the document's
/// rendered extent.
pub fn is_visible(dom: &dyn Dom, id: NodeId) -> bool {
    if dom.is_hidden(id) {
        return false;
    }
    let rect = dom.bounding_box(id);
    if rect.is_empty() {
        return false;
    }
    rect.intersects(&dom.document_extent())
}
