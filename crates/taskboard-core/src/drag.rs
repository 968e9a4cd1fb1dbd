use std::collections::BTreeMap;

use tracing::debug;

/// Attribute that opts an element and its descendants out of drag handling.
pub const DEFAULT_NO_DRAG_MARKER: &str = "data-no-dnd";

/// The view of a UI node the drag gate needs: its parent, its attributes and
/// whether it is the document root.
pub trait DragNode {
    fn parent_node(&self) -> Option<&Self>;

    fn attribute(&self, name: &str) -> Option<&str>;

    fn is_document_root(&self) -> bool {
        false
    }
}

/// Decides whether a pointer-down should start a card drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragGate {
    marker: String,
}

impl Default for DragGate {
    fn default() -> Self {
        Self::new(DEFAULT_NO_DRAG_MARKER)
    }
}

impl DragGate {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Walks from `origin` up its parent chain and refuses the drag as soon as
    /// a node carries the marker. A marker whose value is `"false"` does not
    /// count. The walk stops at the document root.
    pub fn should_handle<N: DragNode>(&self, origin: Option<&N>) -> bool {
        let mut current = origin;
        let mut depth = 0usize;

        while let Some(node) = current {
            if node.is_document_root() {
                break;
            }
            if node
                .attribute(&self.marker)
                .is_some_and(|value| value != "false")
            {
                debug!(marker = %self.marker, depth, "drag suppressed by marker");
                return false;
            }
            current = node.parent_node();
            depth += 1;
        }

        true
    }
}

/// Owned element path for hosts without a DOM: each element owns its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    parent: Option<Box<Element>>,
}

impl Element {
    pub const DOCUMENT_TAG: &'static str = "#document";

    pub fn document() -> Self {
        Self::detached(Self::DOCUMENT_TAG)
    }

    pub fn detached(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            parent: None,
        }
    }

    /// Creates a child element whose ancestor chain is `self`.
    #[must_use]
    pub fn child(self, tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            parent: Some(Box::new(self)),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl DragNode for Element {
    fn parent_node(&self) -> Option<&Self> {
        self.parent.as_deref()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn is_document_root(&self) -> bool {
        self.tag == Self::DOCUMENT_TAG
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_NO_DRAG_MARKER, DragGate, Element};

    fn card() -> Element {
        Element::document()
            .child("html")
            .child("body")
            .child("div")
            .with_attr("class", "kanban-card")
    }

    #[test]
    fn plain_card_body_starts_a_drag() {
        let gate = DragGate::default();
        let target = card().child("span");
        assert!(gate.should_handle(Some(&target)));
    }

    #[test]
    fn marked_ancestor_blocks_drag() {
        let gate = DragGate::default();
        let target = card()
            .child("div")
            .with_attr(DEFAULT_NO_DRAG_MARKER, "true")
            .child("button")
            .child("svg");
        assert!(!gate.should_handle(Some(&target)));
    }

    #[test]
    fn marked_origin_blocks_drag() {
        let gate = DragGate::default();
        let target = card().child("input").with_attr(DEFAULT_NO_DRAG_MARKER, "");
        assert!(!gate.should_handle(Some(&target)));
    }

    #[test]
    fn explicit_false_marker_does_not_block() {
        let gate = DragGate::default();
        let target = card().child("div").with_attr(DEFAULT_NO_DRAG_MARKER, "false");
        assert!(gate.should_handle(Some(&target)));
    }

    #[test]
    fn walk_stops_at_document_root() {
        let gate = DragGate::default();
        let target = Element::detached("above")
            .with_attr(DEFAULT_NO_DRAG_MARKER, "true")
            .child(Element::DOCUMENT_TAG)
            .child("div");
        assert!(gate.should_handle(Some(&target)));
    }

    #[test]
    fn missing_origin_is_allowed() {
        let gate = DragGate::default();
        assert!(gate.should_handle::<Element>(None));
    }

    #[test]
    fn custom_marker_name() {
        let gate = DragGate::new("data-static");
        let target = card().with_attr("data-static", "1").child("p");
        assert!(!gate.should_handle(Some(&target)));
        assert_eq!(gate.marker(), "data-static");
    }
}
