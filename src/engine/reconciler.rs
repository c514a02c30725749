//! Scan, track and render in one pass, writing the panel only when its
//! markup actually changed.
//!
//! The panel lives inside the observed document, so every write shows up as
//! a mutation and schedules another refresh. Skipping byte-identical writes
//! is what lets that loop settle after one extra round.

use super::scanner::{Outline, Scanner};
use super::state::PanelState;
use super::tracker::ActiveTracker;
use crate::dom::Document;
use crate::render::panel::render_panel;
use crate::store::LabelBook;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub scans: usize,
    pub renders: usize,
    pub writes: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    committed: Option<String>,
    stats: ReconcileStats,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }

    pub fn committed(&self) -> Option<&str> {
        self.committed.as_deref()
    }

    /// Forget the committed markup, e.g. after the panel was removed.
    pub fn invalidate(&mut self) {
        self.committed = None;
    }

    /// Rescan the transcript, recompute the active entry and render.
    /// Returns `false` without touching anything while the state is busy.
    #[allow(clippy::too_many_arguments)]
    pub fn refresh(
        &mut self,
        doc: &mut Document,
        scanner: &mut Scanner,
        tracker: &ActiveTracker,
        outline: &mut Outline,
        state: &mut PanelState,
        labels: &LabelBook,
        rename_max: usize,
    ) -> bool {
        if state.is_busy() {
            log::trace!("refresh deferred: panel busy");
            return false;
        }
        *outline = scanner.scan(doc, Some(outline));
        self.stats.scans += 1;
        state.active_entry_id = tracker.compute_active(outline, doc);
        if state
            .tooltip
            .as_deref()
            .is_some_and(|id| outline.get(id).is_none())
        {
            state.tooltip = None;
        }
        self.render(doc, outline, state, labels, rename_max);
        true
    }

    /// Render the panel and commit it if it differs from what is on screen.
    /// Returns whether the document was written.
    pub fn render(
        &mut self,
        doc: &mut Document,
        outline: &Outline,
        state: &PanelState,
        labels: &LabelBook,
        rename_max: usize,
    ) -> bool {
        let html = render_panel(outline, state, labels, rename_max);
        self.stats.renders += 1;
        if self.committed.as_deref() == Some(html.as_str()) && doc.panel_html() == Some(html.as_str()) {
            self.stats.skipped += 1;
            return false;
        }
        doc.write_panel(&html);
        self.committed = Some(html);
        self.stats.writes += 1;
        true
    }
}
