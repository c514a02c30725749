//! Panel markup.
//!
//! Rendering is a pure function of the outline, the panel state and the
//! label book, so two renders of the same inputs are byte-identical. The
//! reconciler relies on that to skip redundant writes.

use std::fmt::Write;

use crate::engine::scanner::{Entry, Outline};
use crate::engine::state::PanelState;
use crate::store::LabelBook;

pub const PANEL_ID: &str = "chatanchor-panel";

/// Escape text for use in element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Entries that pass the search filter, matched against both the display
/// name and the scanned summary.
pub fn visible_entries<'a>(
    outline: &'a Outline,
    state: &PanelState,
    labels: &'a LabelBook,
) -> Vec<&'a Entry> {
    let term = state.search_term.as_str();
    outline
        .iter()
        .filter(|entry| {
            term.is_empty()
                || labels.display_name(entry).to_lowercase().contains(term)
                || entry.summary_text.to_lowercase().contains(term)
        })
        .collect()
}

pub fn render_panel(
    outline: &Outline,
    state: &PanelState,
    labels: &LabelBook,
    rename_max: usize,
) -> String {
    let mut html = String::new();
    let collapsed = if state.is_collapsed { " ca-collapsed" } else { "" };
    let _ = write!(html, r#"<div id="{PANEL_ID}" class="ca-panel{collapsed}">"#);

    let _ = write!(
        html,
        r#"<div class="ca-header"><div class="ca-title"><span>Contents</span><span class="ca-count">{}</span></div><div class="ca-header-actions"><button class="ca-btn ca-btn-collapse" title="Collapse panel">&#215;</button></div></div>"#,
        outline.len()
    );
    let _ = write!(
        html,
        r#"<div class="ca-search"><input type="text" class="ca-search-input" placeholder="Search messages..." value="{}"></div>"#,
        escape(&state.search_term)
    );

    html.push_str(r#"<div class="ca-list">"#);
    let visible = visible_entries(outline, state, labels);
    if visible.is_empty() {
        html.push_str(r#"<div class="ca-empty">No messages</div>"#);
    }
    for entry in visible {
        render_row(&mut html, entry, state, labels, rename_max);
    }
    html.push_str("</div>");

    if let Some(entry) = state.tooltip.as_deref().and_then(|id| outline.get(id)) {
        let _ = write!(
            html,
            r#"<div class="ca-tooltip" data-for="{}">{}</div>"#,
            escape(&entry.id),
            escape(&entry.preview_text)
        );
    }

    html.push_str("</div>");
    html
}

fn render_row(html: &mut String, entry: &Entry, state: &PanelState, labels: &LabelBook, rename_max: usize) {
    let id = escape(&entry.id);
    let name = escape(labels.display_name(entry));

    if state.editing_entry_id() == Some(entry.id.as_str()) {
        let _ = write!(
            html,
            r#"<div class="ca-item ca-item-editing" data-id="{id}"><input class="ca-rename-input" maxlength="{rename_max}" value="{name}"></div>"#
        );
        return;
    }

    let mut classes = String::from("ca-item");
    if state.active_entry_id.as_deref() == Some(entry.id.as_str()) {
        classes.push_str(" ca-item-active");
    }
    if state.summarizing_entry_id() == Some(entry.id.as_str()) {
        classes.push_str(" ca-item-summarizing");
    }
    let indicator = if state.jump_target.as_deref() == Some(entry.id.as_str()) {
        " ca-indicator-active"
    } else {
        ""
    };

    let _ = write!(
        html,
        r#"<div class="{classes}" data-id="{id}" data-fulltext="{}"><span class="ca-item-indicator{indicator}"></span><span class="ca-item-type ca-type-user">Q{}</span><span class="ca-item-summary">{name}</span><button class="ca-item-rename-btn" title="Rename">&#9998;</button><button class="ca-item-ai-btn" title="Summarize">&#10022;</button></div>"#,
        escape(&entry.preview_text),
        entry.index
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavigatorConfig;
    use crate::dom::Document;
    use crate::engine::scanner::Scanner;
    use crate::engine::state::Interaction;
    use std::collections::HashMap;

    fn outline() -> Outline {
        let html = r#"<main>
            <article data-testid="conversation-turn-1" data-turn="user"><div class="whitespace-pre-wrap">Install <rust></div></article>
            <article data-testid="conversation-turn-2" data-turn="user"><div class="whitespace-pre-wrap">Borrow checker</div></article>
        </main>"#;
        let doc = Document::from_html(html, "https://chatgpt.com/c/x");
        Scanner::from_config(&NavigatorConfig::default()).unwrap().scan(&doc, None)
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn render_is_deterministic() {
        let outline = outline();
        let state = PanelState::default();
        let labels = LabelBook::default();
        assert_eq!(
            render_panel(&outline, &state, &labels, 50),
            render_panel(&outline, &state, &labels, 50)
        );
    }

    #[test]
    fn marks_active_and_editing_rows() {
        let outline = outline();
        let state = PanelState {
            active_entry_id: Some("conversation-turn-2".into()),
            interaction: Interaction::Editing("conversation-turn-1".into()),
            ..PanelState::default()
        };
        let html = render_panel(&outline, &state, &LabelBook::default(), 50);
        assert!(html.contains(r#"<div class="ca-item ca-item-editing" data-id="conversation-turn-1"><input class="ca-rename-input" maxlength="50""#));
        assert!(html.contains(r#"<div class="ca-item ca-item-active" data-id="conversation-turn-2""#));
        assert!(html.contains("<span class=\"ca-item-type ca-type-user\">Q2</span>"));
    }

    #[test]
    fn search_matches_custom_labels_and_summaries() {
        let outline = outline();
        let mut labels = HashMap::new();
        labels.insert("conversation-turn-2".to_string(), "Lifetimes".to_string());
        let labels = LabelBook::new(Some("x".into()), labels);

        let by_label = PanelState {
            search_term: "lifetimes".into(),
            ..PanelState::default()
        };
        let ids: Vec<&str> = visible_entries(&outline, &by_label, &labels)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["conversation-turn-2"]);

        let by_summary = PanelState {
            search_term: "borrow".into(),
            ..PanelState::default()
        };
        assert_eq!(visible_entries(&outline, &by_summary, &labels).len(), 1);

        let none = PanelState {
            search_term: "zzz".into(),
            ..PanelState::default()
        };
        let html = render_panel(&outline, &none, &labels, 50);
        assert!(html.contains("ca-empty"));
    }

    #[test]
    fn custom_label_replaces_summary_text() {
        let outline = outline();
        let mut labels = HashMap::new();
        labels.insert("conversation-turn-1".to_string(), "Setup".to_string());
        let html = render_panel(
            &outline,
            &PanelState::default(),
            &LabelBook::new(None, labels),
            50,
        );
        assert!(html.contains(r#"<span class="ca-item-summary">Setup</span>"#));
        assert!(html.contains(r#"<span class="ca-item-summary">Borrow checker</span>"#));
    }

    #[test]
    fn tooltip_shows_preview() {
        let outline = outline();
        let state = PanelState {
            tooltip: Some("conversation-turn-2".into()),
            ..PanelState::default()
        };
        let html = render_panel(&outline, &state, &LabelBook::default(), 50);
        assert!(html.contains(r#"<div class="ca-tooltip" data-for="conversation-turn-2">Borrow checker</div>"#));
    }
}
