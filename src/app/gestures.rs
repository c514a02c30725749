//! User gestures on the panel.

use crate::engine::state::Interaction;
use crate::store::normalize_label;

use super::{Navigator, Task};

impl Navigator {
    /// Jump to an entry. Returns false if the outline has no such entry.
    pub fn click_entry(&mut self, entry_id: &str) -> bool {
        let Some(entry) = self.outline.get(entry_id) else {
            log::debug!("click on unknown entry {}", entry_id);
            return false;
        };
        let anchor = entry.anchor;
        self.animator
            .animate_to(entry_id, anchor, &self.doc, &mut self.sched, Task::Frame);
        self.state.is_animating = true;
        self.state.jump_target = Some(entry_id.to_string());
        self.render();
        true
    }

    /// Pointer entered (`Some`) or left (`None`) an entry row. The preview
    /// tooltip shows after the hover delay.
    pub fn hover_entry(&mut self, entry_id: Option<&str>) {
        if let Some(id) = self.tooltip_timer.take() {
            self.sched.cancel(id);
        }
        match entry_id {
            Some(entry_id) => {
                let task = Task::Tooltip(entry_id.to_string());
                self.tooltip_timer = Some(self.sched.set_timeout(self.config.tooltip_delay(), task));
            }
            None => {
                if self.state.tooltip.take().is_some() {
                    self.render();
                }
            }
        }
    }

    /// Keystroke in the search box; filtering applies once typing pauses.
    pub fn search_input(&mut self, raw: &str) {
        let term = raw.trim().to_lowercase();
        self.search_debounce.call(&mut self.sched, Task::Search, term);
    }

    /// Open the inline editor on an entry. Refused while a summary for any
    /// entry is in flight.
    pub fn start_rename(&mut self, entry_id: &str) -> bool {
        if self.outline.get(entry_id).is_none() {
            return false;
        }
        if let Interaction::Summarizing(busy) = &self.state.interaction {
            log::debug!("rename refused: summarizing {}", busy);
            return false;
        }
        self.state.interaction = Interaction::Editing(entry_id.to_string());
        self.render();
        true
    }

    /// Commit the editor's value. An empty value clears the custom label.
    /// Returns the label now in effect, if any.
    pub fn confirm_rename(&mut self, raw: &str) -> Option<String> {
        let Interaction::Editing(entry_id) = std::mem::take(&mut self.state.interaction) else {
            return None;
        };
        let label = self.labels.assign(&entry_id, raw, self.config.rename_max_len);
        self.persist_label(None, &entry_id, label.as_deref());
        self.refresh_or_render();
        label
    }

    pub fn cancel_rename(&mut self) {
        if self.state.editing_entry_id().is_none() {
            return;
        }
        self.state.interaction = Interaction::Idle;
        self.refresh_or_render();
    }

    pub fn toggle_collapse(&mut self) -> bool {
        self.state.is_collapsed = !self.state.is_collapsed;
        if let Err(e) = self.store.set_collapsed(self.state.is_collapsed) {
            log::warn!("could not save panel preference: {}", e);
        }
        self.refresh_or_render();
        self.state.is_collapsed
    }

    /// Write one label through to the store. `conversation` defaults to the
    /// loaded one; without any conversation the label stays in memory.
    pub(crate) fn persist_label(&mut self, conversation: Option<&str>, entry_id: &str, label: Option<&str>) {
        let Some(conversation) = conversation
            .map(str::to_string)
            .or_else(|| self.labels.conversation().map(str::to_string))
        else {
            log::debug!("no conversation id; label for {} kept in memory", entry_id);
            return;
        };
        let label = label.and_then(|l| normalize_label(l, self.config.rename_max_len));
        if let Err(e) = self.store.set(&conversation, entry_id, label.as_deref()) {
            log::warn!("could not save label for {}: {}", entry_id, e);
        }
    }
}
