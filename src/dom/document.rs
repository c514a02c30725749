//! The live host document.
//!
//! Owns the DOM tree, its layout, the scroll container and the panel region
//! the navigator renders into. Every structural change relays the tree and
//! raises a mutation notification; every change of scroll offset raises a
//! scroll notification. Observers drain the notification counters.

use super::css::parse_inline_style;
use super::parser::{parse_fragment, parse_html};
use super::{DomNode, DomTree, NodeId, Selector};
use crate::render::layout::{compute_layout, PageLayout};

/// The scroll container's placement in the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Distance of the container's top edge from the viewport top.
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// Leading scroll padding (`scroll-padding-top`).
    pub padding_top: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            top: 0.0,
            width: 800.0,
            height: 800.0,
            padding_top: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    tree: DomTree,
    layout: PageLayout,
    viewport: Viewport,
    scroll_top: f32,
    panel: Option<String>,
    mutations: usize,
    scrolls: usize,
    revision: u64,
}

impl Document {
    pub fn from_html(html: &str, location: &str) -> Self {
        Self::from_tree(parse_html(html, location))
    }

    pub fn from_tree(tree: DomTree) -> Self {
        let viewport = Viewport::default();
        let layout = compute_layout(&tree.root, viewport.width);
        Self {
            tree,
            layout,
            viewport,
            scroll_top: 0.0,
            panel: None,
            mutations: 0,
            scrolls: 0,
            revision: 0,
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.set_viewport(viewport);
        self
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        let relayout = viewport.width != self.viewport.width;
        self.viewport = viewport;
        if relayout {
            self.layout = compute_layout(&self.tree.root, self.viewport.width);
        }
        self.clamp_scroll();
    }

    /// Pick up `scroll-padding-top` (or `padding-top`) from the node that
    /// acts as the scroll container, if the host page has one.
    pub fn adopt_scroll_root(&mut self, selector: &Selector) -> bool {
        let Some(node) = self.tree.root.query_first(selector) else {
            return false;
        };
        let style = node.attr("style").map(parse_inline_style).unwrap_or_default();
        if let Some(padding) = style.scroll_padding_top.or(style.padding_top) {
            self.viewport.padding_top = padding;
        }
        true
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn root(&self) -> &DomNode {
        &self.tree.root
    }

    pub fn location(&self) -> &str {
        &self.tree.url
    }

    /// Client-side navigation: the location changes and the host rewrites
    /// the transcript.
    pub fn navigate(&mut self, location: &str, html: &str) {
        self.tree = parse_html(html, location);
        self.scroll_top = 0.0;
        self.scrolls += 1;
        self.after_mutation();
    }

    /// Replace the whole document body; every node gets a new identity.
    pub fn reload(&mut self, html: &str) {
        let location = self.tree.url.clone();
        self.tree = parse_html(html, &location);
        self.after_mutation();
    }

    /// Parse `html` and append it to the first node matching `parent`.
    pub fn append_html(&mut self, parent: &Selector, html: &str) -> bool {
        let nodes = parse_fragment(html);
        let found = self.tree.root.query_first(parent).map(|n| n.id);
        let Some(target) = found.and_then(|id| self.tree.root.find_mut(id)) else {
            log::debug!("append target `{}` not found", parent);
            return false;
        };
        target.children.extend(nodes);
        self.after_mutation();
        true
    }

    /// Overwrite one node's inline style (lazy content growing in place).
    pub fn set_node_style(&mut self, id: NodeId, style: &str) -> bool {
        let found = match self.tree.root.find_mut(id) {
            Some(node) => {
                node.set_attr("style", style);
                true
            }
            None => false,
        };
        if found {
            self.after_mutation();
        }
        found
    }

    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.tree.root.find(id)
    }

    /// Top edge of a node relative to the viewport top, like
    /// `getBoundingClientRect().top`. `None` once the node is gone.
    pub fn node_top(&self, id: NodeId) -> Option<f32> {
        self.layout
            .get(id)
            .map(|b| self.viewport.top + b.y - self.scroll_top)
    }

    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    pub fn max_scroll(&self) -> f32 {
        (self.layout.content_height() - self.viewport.height).max(0.0)
    }

    /// Set the container's scroll offset, clamped to the scrollable range.
    /// Returns the offset actually applied.
    pub fn scroll_to(&mut self, y: f32) -> f32 {
        let clamped = if y.is_finite() {
            y.clamp(0.0, self.max_scroll())
        } else {
            self.scroll_top
        };
        if clamped != self.scroll_top {
            self.scroll_top = clamped;
            self.scrolls += 1;
        }
        self.scroll_top
    }

    pub fn write_panel(&mut self, html: &str) {
        self.panel = Some(html.to_string());
        self.mutations += 1;
        self.revision += 1;
    }

    pub fn remove_panel(&mut self) {
        if self.panel.take().is_some() {
            self.mutations += 1;
            self.revision += 1;
        }
    }

    pub fn panel_html(&self) -> Option<&str> {
        self.panel.as_deref()
    }

    /// Drain pending mutation notifications.
    pub fn take_mutations(&mut self) -> usize {
        std::mem::take(&mut self.mutations)
    }

    /// Drain pending scroll notifications.
    pub fn take_scrolls(&mut self) -> usize {
        std::mem::take(&mut self.scrolls)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn after_mutation(&mut self) {
        self.layout = compute_layout(&self.tree.root, self.viewport.width);
        self.mutations += 1;
        self.revision += 1;
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        let max = self.max_scroll();
        if self.scroll_top > max {
            self.scroll_top = max;
            self.scrolls += 1;
        }
    }
}
