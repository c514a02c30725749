use crate::dom::{DomNode, DomTree};
use scraper::{ElementRef, Html, Node};
use std::collections::HashMap;

/// Tags whose children should be stripped (invisible/script content)
const SKIP_CHILDREN: &[&str] = &["script", "style", "noscript", "svg", "template"];

/// Parse a full transcript page into a DomTree
pub fn parse_html(html: &str, url: &str) -> DomTree {
    let document = Html::parse_document(html);

    let title = scraper::Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();

    let root = DomNode::document(vec![convert_element(document.root_element())]);

    DomTree {
        root,
        url: url.to_string(),
        title: title.trim().to_string(),
    }
}

/// Parse an HTML fragment (e.g. one freshly streamed turn) into detached
/// nodes ready to be spliced into a live tree.
pub fn parse_fragment(html: &str) -> Vec<DomNode> {
    let fragment = Html::parse_fragment(html);
    // parse_fragment wraps its content in a synthetic <html> element
    convert_element(fragment.root_element()).children
}

fn convert_element(el: ElementRef<'_>) -> DomNode {
    let tag = el.value().name.local.as_ref().to_string();
    let attributes: HashMap<String, String> = el
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    if SKIP_CHILDREN.contains(&tag.as_str()) {
        return DomNode::element(tag, attributes, Vec::new());
    }

    let mut children = Vec::new();

    for child_ref in el.children() {
        match child_ref.value() {
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child_ref) {
                    children.push(convert_element(child_el));
                }
            }
            Node::Text(t) => {
                let s = t.text.to_string();
                if !s.trim().is_empty() {
                    children.push(DomNode::text(s));
                }
            }
            _ => {}
        }
    }

    DomNode::element(tag, attributes, children)
}
