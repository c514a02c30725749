//! Panel state shared by every subsystem of the navigator.

/// Interactive work in progress on one entry. Editing and summarizing are
/// mutually exclusive, and either one holds off ambient refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Editing(String),
    Summarizing(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelState {
    pub active_entry_id: Option<String>,
    /// Lowercased search filter; empty shows everything.
    pub search_term: String,
    pub interaction: Interaction,
    pub is_animating: bool,
    pub is_collapsed: bool,
    /// Entry most recently jumped to from the panel.
    pub jump_target: Option<String>,
    /// Entry whose preview tooltip is showing.
    pub tooltip: Option<String>,
}

impl PanelState {
    pub fn editing_entry_id(&self) -> Option<&str> {
        match &self.interaction {
            Interaction::Editing(id) => Some(id),
            _ => None,
        }
    }

    pub fn summarizing_entry_id(&self) -> Option<&str> {
        match &self.interaction {
            Interaction::Summarizing(id) => Some(id),
            _ => None,
        }
    }

    /// Whether a rescan now would fight the user or the animator.
    pub fn is_busy(&self) -> bool {
        self.is_animating || self.interaction != Interaction::Idle
    }
}
