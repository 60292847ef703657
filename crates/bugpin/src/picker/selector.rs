//! CSS selector and XPath builders for picked elements.

use crate::dom::{Dom, NodeId};

/// Build a CSS selector for the element.
///
/// An element with an `id` attribute short-circuits to `#id`. Otherwise
/// the selector is a `>`-joined path from the element up to (not
/// including) `body`, each segment `tag[.firstTwoClasses][:nth-of-type(n)]`
/// with the nth-of-type qualifier added only when the element has
/// same-tag siblings.
pub fn css_selector(dom: &dyn Dom, id: NodeId) -> String {
    if let Some(id_attr) = dom.id_attr(id) {
        return format!("#{id_attr}");
    }
    let mut segments = Vec::new();
    let mut current = Some(id);
    while let Some(node) = current {
        let tag = dom.tag_name(node);
        if tag.is_empty() || tag == "body" || tag == "html" {
            break;
        }
        let mut segment = tag.clone();
        for class in dom.classes(node).iter().take(2) {
            segment.push('.');
            segment.push_str(class);
        }
        if let Some(n) = nth_of_type(dom, node, &tag) {
            segment.push_str(&format!(":nth-of-type({n})"));
        }
        segments.push(segment);
        current = dom.parent(node);
    }
    segments.reverse();
    segments.join(" > ")
}

/// Build an XPath for the element: a `/`-joined path down from the
/// document root, with 1-based indices for same-named siblings.
pub fn xpath(dom: &dyn Dom, id: NodeId) -> String {
    let mut segments = Vec::new();
    let mut current = Some(id);
    while let Some(node) = current {
        let tag = dom.tag_name(node);
        if tag.is_empty() {
            break;
        }
        match nth_of_type(dom, node, &tag) {
            Some(n) => segments.push(format!("{tag}[{n}]")),
            None => segments.push(tag),
        }
        current = dom.parent(node);
    }
    segments.reverse();
    format!("/{}", segments.join("/"))
}

/// 1-based index among same-tag siblings, or `None` when the element is
/// the only child with its tag.
fn nth_of_type(dom: &dyn Dom, id: NodeId, tag: &str) -> Option<usize> {
    let parent = dom.parent(id)?;
    let same_tag: Vec<NodeId> = dom
        .children(parent)
        .into_iter()
        .filter(|&sibling| dom.tag_name(sibling) == tag)
        .collect();
    if same_tag.len() > 1 {
        Some(same_tag.iter().position(|&s| s == id).unwrap_or(0) + 1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::{Elem, SimDom};
    use crate::types::Rect;

    /// body > section > div (x2 siblings) > span
    fn three_level_fixture() -> (SimDom, NodeId, NodeId) {
        let dom = SimDom::new();
        let section = dom.insert(dom.body(), Elem::new("section").classes(["content"]));
        let _first = dom.insert(section, Elem::new("div").classes(["row"]));
        let second = dom.insert(section, Elem::new("div").classes(["row", "alt", "extra"]));
        let span = dom.insert(second, Elem::new("span").text("hello"));
        (dom, second, span)
    }

    #[test]
    fn id_attribute_short_circuits() {
        let dom = SimDom::new();
        let el = dom.insert(
            dom.body(),
            Elem::new("button").id("save").bounds(Rect::new(0.0, 0.0, 10.0, 10.0)),
        );
        assert_eq!(css_selector(&dom, el), "#save");
    }

    #[test]
    fn nth_of_type_appears_only_at_ambiguous_level() {
        let (dom, second, span) = three_level_fixture();

        let selector = css_selector(&dom, span);
        assert_eq!(selector, "section.content > div.row.alt:nth-of-type(2) > span");
        // Exactly one nth-of-type qualifier, at the sibling level.
        assert_eq!(selector.matches(":nth-of-type").count(), 1);

        assert_eq!(
            css_selector(&dom, second),
            "section.content > div.row.alt:nth-of-type(2)"
        );
    }

    #[test]
    fn classes_are_capped_at_two() {
        let (dom, second, _) = three_level_fixture();
        let selector = css_selector(&dom, second);
        assert!(selector.contains("div.row.alt"));
        assert!(!selector.contains("extra"));
    }

    #[test]
    fn xpath_walks_to_document_root() {
        let (dom, _, span) = three_level_fixture();
        assert_eq!(xpath(&dom, span), "/html/body/section/div[2]/span");
    }

    #[test]
    fn xpath_indexes_only_same_named_siblings() {
        let dom = SimDom::new();
        let div = dom.insert(dom.body(), Elem::new("div"));
        let _p = dom.insert(div, Elem::new("p"));
        let em = dom.insert(div, Elem::new("em"));
        // p and em are siblings with different tags: no indices.
        assert_eq!(xpath(&dom, em), "/html/body/div/em");
    }
}
