pub mod parser;
pub mod selector;
pub mod css;
pub mod document;

pub use document::{Document, Viewport};
pub use selector::Selector;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a live node.
///
/// Ids are never reused: a node rebuilt by the host (re-parse, subtree
/// replacement) gets a fresh id even when its markup is unchanged, which is
/// exactly the instability the outline has to tolerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Document,
    Element,
    Text,
}

/// Internal DOM node representation.
#[derive(Debug, Clone)]
pub struct DomNode {
    pub id: NodeId,
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub children: Vec<DomNode>,
    pub node_type: NodeType,
}

impl DomNode {
    pub fn document(children: Vec<DomNode>) -> Self {
        Self {
            id: NodeId::fresh(),
            tag: "#document".into(),
            attributes: HashMap::new(),
            text: String::new(),
            children,
            node_type: NodeType::Document,
        }
    }

    pub fn element(
        tag: impl Into<String>,
        attrs: HashMap<String, String>,
        children: Vec<DomNode>,
    ) -> Self {
        Self {
            id: NodeId::fresh(),
            tag: tag.into(),
            attributes: attrs,
            text: String::new(),
            children,
            node_type: NodeType::Element,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            id: NodeId::fresh(),
            tag: String::new(),
            attributes: HashMap::new(),
            text: content.into(),
            children: Vec::new(),
            node_type: NodeType::Text,
        }
    }

    /// Recursively count all nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Collect all text content recursively
    pub fn collect_text(&self) -> String {
        let mut buf = String::new();
        self.collect_text_inner(&mut buf);
        buf
    }

    fn collect_text_inner(&self, buf: &mut String) {
        if !self.text.is_empty() {
            if !buf.is_empty() {
                buf.push(' ');
            }
            buf.push_str(self.text.trim());
        }
        for child in &self.children {
            child.collect_text_inner(buf);
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    /// Whitespace-separated entries of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    /// First node in this subtree (self included, pre-order) matching `sel`.
    /// Combinators see ancestors from this node down.
    pub fn query_first(&self, sel: &Selector) -> Option<&DomNode> {
        first_match(self, sel, &mut Vec::new())
    }

    /// First strict descendant matching `sel`.
    pub fn query_descendant(&self, sel: &Selector) -> Option<&DomNode> {
        let mut path = vec![self];
        self.children.iter().find_map(|c| first_match(c, sel, &mut path))
    }

    /// All nodes in this subtree matching `sel`, in document order.
    pub fn query_all<'a>(&'a self, sel: &Selector) -> Vec<&'a DomNode> {
        let mut out = Vec::new();
        collect_matches(self, sel, &mut Vec::new(), &mut out);
        out
    }

    pub fn find(&self, id: NodeId) -> Option<&DomNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut DomNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }
}

fn first_match<'a>(node: &'a DomNode, sel: &Selector, path: &mut Vec<&'a DomNode>) -> Option<&'a DomNode> {
    if sel.matches_in(node, path) {
        return Some(node);
    }
    path.push(node);
    let found = node.children.iter().find_map(|c| first_match(c, sel, path));
    path.pop();
    found
}

fn collect_matches<'a>(
    node: &'a DomNode,
    sel: &Selector,
    path: &mut Vec<&'a DomNode>,
    out: &mut Vec<&'a DomNode>,
) {
    if sel.matches_in(node, path) {
        out.push(node);
    }
    path.push(node);
    for child in &node.children {
        collect_matches(child, sel, path, out);
    }
    path.pop();
}

/// Parsed DOM tree with metadata
#[derive(Debug, Clone)]
pub struct DomTree {
    pub root: DomNode,
    pub url: String,
    pub title: String,
}
