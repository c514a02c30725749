use std::collections::HashMap;

use crate::dom::css::parse_inline_style;
use crate::dom::{DomNode, NodeId, NodeType};

/// Bounding box for a laid-out DOM node, in content coordinates of the
/// scroll container (y grows downwards from the top of the content).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Geometry of a whole document, indexed by node identity.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    boxes: HashMap<NodeId, LayoutBox>,
    content_height: f32,
}

impl PageLayout {
    pub fn get(&self, id: NodeId) -> Option<LayoutBox> {
        self.boxes.get(&id).copied()
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

const BLOCK_TAGS: &[&str] = &[
    "html",
    "body",
    "div",
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "ul",
    "ol",
    "li",
    "table",
    "tr",
    "td",
    "th",
    "form",
    "section",
    "article",
    "aside",
    "main",
    "header",
    "footer",
    "nav",
    "blockquote",
    "pre",
    "figure",
    "figcaption",
    "details",
    "summary",
];

/// Per-tag vertical margins (top, bottom) in pixels.
fn tag_margins(tag: &str) -> (f32, f32) {
    match tag {
        "h1" => (24.0, 16.0),
        "h2" => (20.0, 12.0),
        "h3" | "h4" => (16.0, 10.0),
        "h5" | "h6" => (12.0, 8.0),
        "p" => (4.0, 10.0),
        "ul" | "ol" => (8.0, 8.0),
        "li" => (2.0, 2.0),
        "section" | "article" => (16.0, 16.0),
        "blockquote" => (12.0, 12.0),
        "pre" => (8.0, 8.0),
        _ => (0.0, 0.0),
    }
}

/// Per-tag padding in pixels.
fn tag_padding(tag: &str, is_block: bool) -> f32 {
    match tag {
        "section" | "article" | "aside" => 16.0,
        "blockquote" => 20.0,
        "html" | "body" | "main" => 0.0,
        _ if is_block => 4.0,
        _ => 0.0,
    }
}

/// Compute layout for a DOM tree (simple top-to-bottom block model).
///
/// An inline `height` pins a node's box regardless of its content, which is
/// how lazily materialised content (placeholders growing into full turns) is
/// expressed by the host.
pub fn compute_layout(root: &DomNode, viewport_width: f32) -> PageLayout {
    let mut layout = PageLayout::default();
    let mut cursor_y = 0.0;
    layout_node(root, 0.0, &mut cursor_y, viewport_width, 16.0, &mut layout);
    layout.content_height = cursor_y;
    layout
}

fn layout_node(
    node: &DomNode,
    x: f32,
    cursor_y: &mut f32,
    available_width: f32,
    parent_font_size: f32,
    layout: &mut PageLayout,
) {
    let style = node.attr("style").map(parse_inline_style).unwrap_or_default();

    if style.hidden || node.attr("hidden").is_some() {
        layout.boxes.insert(
            node.id,
            LayoutBox {
                x,
                y: *cursor_y,
                width: 0.0,
                height: 0.0,
            },
        );
        return;
    }

    let is_block = node.node_type != NodeType::Text && BLOCK_TAGS.contains(&node.tag.as_str());

    let font_size = match node.tag.as_str() {
        "h1" => 32.0,
        "h2" => 24.0,
        "h3" => 20.0,
        "h4" => 18.0,
        "h5" | "h6" => 16.0,
        "small" => 12.0,
        _ => parent_font_size,
    };

    let (margin_top, margin_bottom) = tag_margins(&node.tag);
    let padding = style
        .padding_top
        .unwrap_or_else(|| tag_padding(&node.tag, is_block));

    if is_block {
        *cursor_y += margin_top;
    }

    let start_y = *cursor_y;
    *cursor_y += padding;

    let child_x = x + padding;
    let child_width = (available_width - padding * 2.0).max(0.0);

    for child in &node.children {
        layout_node(child, child_x, cursor_y, child_width, font_size, layout);
    }

    if !node.text.is_empty() {
        let line_height = font_size * 1.4;
        let chars_per_line = (available_width / (font_size * 0.6)).max(1.0) as usize;
        let chars = node.text.trim().chars().count();
        let lines = (chars as f32 / chars_per_line as f32).ceil().max(1.0);
        *cursor_y += lines * line_height;
    }

    *cursor_y += padding;

    if let Some(fixed) = style.height {
        *cursor_y = start_y + fixed;
    }

    let height = *cursor_y - start_y;

    if is_block {
        *cursor_y += margin_bottom;
    }

    layout.boxes.insert(
        node.id,
        LayoutBox {
            x,
            y: start_y,
            width: available_width,
            height,
        },
    );
}
