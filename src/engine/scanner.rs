//! Outline extraction from the live transcript.
//!
//! A scan walks the turns in document order and emits one entry per
//! question. It never fails: missing sub-nodes degrade to placeholder text
//! and an unrecognised page degrades to an empty outline.

use serde::Serialize;
use uuid::Uuid;

use crate::config::{ConfigError, NavigatorConfig, Selectors};
use crate::dom::{Document, DomNode, NodeId};

/// Label used when a question has no text content.
pub const EMPTY_PLACEHOLDER: &str = "(no content)";
pub const ELLIPSIS: &str = "...";

/// Weak, scan-scoped handle to a live node. Resolving it after the node has
/// been replaced yields nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor(NodeId);

impl Anchor {
    pub fn node(self) -> NodeId {
        self.0
    }

    /// Current viewport-relative top of the anchored node.
    pub fn top(self, doc: &Document) -> Option<f32> {
        doc.node_top(self.0)
    }

    pub fn resolve(self, doc: &Document) -> Option<&DomNode> {
        doc.node(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: String,
    pub index: usize,
    pub summary_text: String,
    pub preview_text: String,
    #[serde(skip)]
    pub anchor: Anchor,
    #[serde(skip)]
    pub reply: Option<Anchor>,
    /// Whether `id` came from the document rather than being generated.
    pub durable: bool,
}

/// The entries of one scan, in document order.
#[derive(Debug, Clone, Default)]
pub struct Outline {
    entries: Vec<Entry>,
    generation: u64,
}

impl Outline {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn by_index(&self, index: usize) -> Option<&Entry> {
        self.entries.iter().find(|e| e.index == index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Which scan produced this outline.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Trim `text` and cap it at `max` characters, marking the cut with `...`.
pub fn truncate_label(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.is_empty() {
        return EMPTY_PLACEHOLDER.to_string();
    }
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

fn fabricate_id() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("ca-{}", &token[..9])
}

pub struct Scanner {
    selectors: Selectors,
    summary_max: usize,
    preview_max: usize,
    generation: u64,
}

impl Scanner {
    pub fn new(selectors: Selectors, summary_max: usize, preview_max: usize) -> Self {
        Self {
            selectors,
            summary_max,
            preview_max,
            generation: 0,
        }
    }

    pub fn from_config(config: &NavigatorConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.selectors.compile()?,
            config.summary_max_len,
            config.preview_max_len,
        ))
    }

    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    /// Build a fresh outline. `previous` lets turns without a durable id
    /// keep the id they were given by the last scan.
    pub fn scan(&mut self, doc: &Document, previous: Option<&Outline>) -> Outline {
        self.generation += 1;
        let mut entries: Vec<Entry> = Vec::new();
        let mut awaiting_reply = false;

        for turn in doc.root().query_all(&self.selectors.turn) {
            if !self.is_question(turn) {
                if awaiting_reply {
                    if let Some(last) = entries.last_mut() {
                        last.reply = Some(Anchor(turn.id));
                    }
                    awaiting_reply = false;
                }
                continue;
            }

            let index = entries.len() + 1;
            let text = self.question_text(turn);
            let summary_text = truncate_label(&text, self.summary_max);
            let preview_text = truncate_label(&text, self.preview_max);

            let (id, durable) = match turn
                .attr(&self.selectors.durable_id_attr)
                .filter(|v| !v.trim().is_empty())
            {
                Some(v) => (v.to_string(), true),
                None => (reuse_id(previous, index, &preview_text), false),
            };

            entries.push(Entry {
                id,
                index,
                summary_text,
                preview_text,
                anchor: Anchor(turn.id),
                reply: None,
                durable,
            });
            awaiting_reply = true;
        }

        log::debug!(
            "scan #{}: {} question(s) in `{}`",
            self.generation,
            entries.len(),
            doc.location()
        );

        Outline {
            entries,
            generation: self.generation,
        }
    }

    fn is_question(&self, turn: &DomNode) -> bool {
        turn.attr(&self.selectors.turn_role_attr) == Some("user")
            || turn.query_descendant(&self.selectors.user_message).is_some()
    }

    fn question_text(&self, turn: &DomNode) -> String {
        turn.query_descendant(&self.selectors.user_content)
            .map(|c| c.collect_text().trim().to_string())
            .unwrap_or_default()
    }

    /// Question and answer of one entry, formatted for the summarizer and
    /// capped at `max_chars`.
    pub fn conversation_text(&self, doc: &Document, entry: &Entry, max_chars: usize) -> String {
        let question = entry
            .anchor
            .resolve(doc)
            .map(|turn| self.question_text(turn))
            .unwrap_or_default();
        let reply = entry
            .reply
            .and_then(|a| a.resolve(doc))
            .map(|turn| turn.collect_text().trim().to_string())
            .unwrap_or_default();

        let mut text = format!("User: {question}");
        if !reply.is_empty() {
            text.push_str("\n\nAssistant: ");
            text.push_str(&reply);
        }
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text,
        }
    }
}

fn reuse_id(previous: Option<&Outline>, index: usize, preview: &str) -> String {
    previous
        .and_then(|p| p.by_index(index))
        .filter(|e| !e.durable && e.preview_text == preview)
        .map(|e| e.id.clone())
        .unwrap_or_else(fabricate_id)
}
