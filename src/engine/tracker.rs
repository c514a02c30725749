//! Active entry selection from scroll position.

use super::scanner::Outline;
use crate::dom::Document;

/// The entry being read is the last one whose top has crossed the
/// activation band at the top of the viewport.
#[derive(Debug, Clone, Copy)]
pub struct ActiveTracker {
    threshold: f32,
}

impl ActiveTracker {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Entries whose anchor no longer resolves are skipped.
    pub fn compute_active(&self, outline: &Outline, doc: &Document) -> Option<String> {
        let mut active = None;
        for entry in outline.iter() {
            match entry.anchor.top(doc) {
                Some(top) if top <= self.threshold => active = Some(entry),
                _ => {}
            }
        }
        active.map(|e| e.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavigatorConfig;
    use crate::engine::scanner::Scanner;

    fn transcript(questions: usize) -> String {
        let turns: String = (1..=questions)
            .map(|n| {
                format!(
                    r#"<article data-testid="conversation-turn-{n}" data-turn="user" style="height: 400px"><div class="whitespace-pre-wrap">q{n}</div></article>"#
                )
            })
            .collect();
        format!("<html><body><main>{turns}</main></body></html>")
    }

    fn setup(questions: usize) -> (Document, Outline) {
        let doc = Document::from_html(&transcript(questions), "https://chatgpt.com/c/t");
        let outline = Scanner::from_config(&NavigatorConfig::default())
            .unwrap()
            .scan(&doc, None);
        (doc, outline)
    }

    #[test]
    fn first_entry_is_active_at_top() {
        let (doc, outline) = setup(5);
        let tracker = ActiveTracker::new(150.0);
        let first_top = outline.entries()[0].anchor.top(&doc).unwrap();
        assert!(first_top <= 150.0);
        assert_eq!(tracker.compute_active(&outline, &doc).as_deref(), Some("conversation-turn-1"));
    }

    #[test]
    fn nothing_active_when_band_is_empty() {
        let (doc, outline) = setup(3);
        let tracker = ActiveTracker::new(-1.0);
        assert_eq!(tracker.compute_active(&outline, &doc), None);
        assert_eq!(tracker.compute_active(&Outline::default(), &doc), None);
    }

    #[test]
    fn crossing_the_band_switches_entry() {
        let (mut doc, outline) = setup(5);
        let tracker = ActiveTracker::new(150.0);
        let third = outline.entries()[2].anchor.top(&doc).unwrap();
        doc.scroll_to(third - 150.0);
        assert_eq!(tracker.compute_active(&outline, &doc).as_deref(), Some("conversation-turn-3"));
        doc.scroll_to(third - 151.0);
        assert_eq!(tracker.compute_active(&outline, &doc).as_deref(), Some("conversation-turn-2"));
    }

    #[test]
    fn active_index_is_monotonic_in_scroll_offset() {
        let (mut doc, outline) = setup(8);
        let tracker = ActiveTracker::new(150.0);
        let mut last_index = 0;
        let mut offset = 0.0;
        while offset <= doc.max_scroll() {
            doc.scroll_to(offset);
            let index = tracker
                .compute_active(&outline, &doc)
                .and_then(|id| outline.get(&id).map(|e| e.index))
                .unwrap_or(0);
            assert!(index >= last_index, "index went back at offset {offset}");
            last_index = index;
            offset += 37.0;
        }
        assert!(last_index > 1);
    }
}
