//! Lifecycle methods for `Navigator`.
//!
//! Covers mounting and teardown, draining the document's mutation and
//! scroll notifications (`pump`), and dispatching due timers.

use std::time::Duration;

use crate::engine::animator::FrameOutcome;
use crate::engine::schedule::TimerId;
use crate::engine::state::Interaction;

use super::{Navigator, Task};

/// Upper bound on tasks run by one `run_until_idle`.
const MAX_IDLE_TASKS: usize = 100_000;

impl Navigator {
    /// Schedule mounting once the host page has had time to settle.
    pub fn start(&mut self) {
        if self.mounted || self.mount_timer.is_some() {
            return;
        }
        self.mount_timer = Some(self.sched.set_timeout(self.config.mount_delay(), Task::Mount));
        log::debug!("mount scheduled in {:?}", self.config.mount_delay());
    }

    /// Attach to the document: load preferences and labels, then render the
    /// first panel. Changes made before this point are not observed.
    pub fn mount(&mut self) {
        if let Some(id) = self.mount_timer.take() {
            self.sched.cancel(id);
        }
        if self.mounted {
            return;
        }

        let selectors = self.scanner.selectors();
        if self.doc.root().query_first(&selectors.thread).is_none() {
            log::debug!("no thread container; observing the whole document");
        }
        let scroll_root = selectors.scroll_container.clone();
        self.doc.adopt_scroll_root(&scroll_root);

        self.state.is_collapsed = self.store.collapsed().unwrap_or_else(|e| {
            log::warn!("could not load panel preference: {}", e);
            false
        });
        self.sync_conversation();

        self.doc.take_mutations();
        self.doc.take_scrolls();
        self.mounted = true;
        self.refresh();
        log::info!(
            "navigator mounted on {} ({} question(s))",
            self.doc.location(),
            self.outline.len()
        );
    }

    /// Detach: cancel every timer and flight, drop transient state and
    /// remove the panel.
    pub fn teardown(&mut self) {
        self.refresh_debounce.cancel(&mut self.sched);
        self.search_debounce.cancel(&mut self.sched);
        self.animator.cancel(&mut self.sched);
        for id in [self.tooltip_timer.take(), self.mount_timer.take()].into_iter().flatten() {
            self.sched.cancel(id);
        }
        self.sched.clear();

        self.state.is_animating = false;
        self.state.tooltip = None;
        self.state.jump_target = None;
        if self.state.editing_entry_id().is_some() {
            self.state.interaction = Interaction::Idle;
        }
        self.doc.remove_panel();
        self.doc.take_mutations();
        self.doc.take_scrolls();
        self.reconciler.invalidate();
        self.mounted = false;
        log::info!("navigator torn down");
    }

    /// Deliver pending document notifications and worker replies.
    pub fn pump(&mut self) {
        if !self.mounted {
            return;
        }

        if self.doc.take_mutations() > 0 {
            if self.sync_conversation() {
                log::debug!("location changed to {}", self.doc.location());
                self.refresh_or_render();
            }
            self.refresh_debounce.call(&mut self.sched, Task::Refresh, ());
        }

        if self.doc.take_scrolls() > 0 && self.scroll_throttle.admit(self.sched.now()) {
            self.on_scroll();
        }

        self.poll_summaries();
    }

    fn on_scroll(&mut self) {
        if self.state.is_animating {
            return;
        }
        let active = self.tracker.compute_active(&self.outline, &self.doc);
        if active != self.state.active_entry_id {
            log::trace!("active entry -> {:?}", active);
            self.state.active_entry_id = active;
            self.render();
        }
    }

    /// Let `dt` of virtual time pass, running every timer that falls due.
    pub fn advance(&mut self, dt: Duration) {
        let until = self.sched.now() + dt;
        self.pump();
        while let Some((id, task)) = self.sched.pop_due(until) {
            self.dispatch(id, task);
            self.pump();
        }
        self.sched.advance_to(until);
        self.pump();
    }

    /// Run timers until none are left. Returns how many ran.
    pub fn run_until_idle(&mut self) -> usize {
        let mut ran = 0;
        self.pump();
        while let Some(at) = self.sched.next_deadline() {
            if ran >= MAX_IDLE_TASKS {
                log::warn!("still busy after {} tasks; giving up", ran);
                break;
            }
            if let Some((id, task)) = self.sched.pop_due(at) {
                self.dispatch(id, task);
                ran += 1;
            }
            self.pump();
        }
        ran
    }

    pub fn now(&self) -> Duration {
        self.sched.now()
    }

    fn dispatch(&mut self, id: TimerId, task: Task) {
        match task {
            Task::Mount => {
                if self.mount_timer == Some(id) {
                    self.mount_timer = None;
                    self.mount();
                }
            }
            Task::Refresh => {
                if self.refresh_debounce.fire(id).is_some() {
                    self.refresh();
                }
            }
            Task::Search => {
                if let Some(term) = self.search_debounce.fire(id) {
                    self.state.search_term = term;
                    self.render();
                }
            }
            Task::Frame => self.on_frame(id),
            Task::Tooltip(entry_id) => {
                if self.tooltip_timer == Some(id) {
                    self.tooltip_timer = None;
                    if self.outline.get(&entry_id).is_some() {
                        self.state.tooltip = Some(entry_id);
                        self.render();
                    }
                }
            }
        }
    }

    fn on_frame(&mut self, id: TimerId) {
        match self.animator.on_frame(id, &mut self.doc, &mut self.sched, Task::Frame) {
            FrameOutcome::InFlight { .. } | FrameOutcome::Stale => {}
            FrameOutcome::Landed { entry_id, offset } => {
                log::debug!("landed on {} at {:.1}", entry_id, offset);
                self.state.is_animating = false;
                self.state.active_entry_id = Some(entry_id);
                self.render();
            }
            FrameOutcome::Lost { entry_id } => {
                log::debug!("scroll target {} vanished", entry_id);
                self.state.is_animating = false;
                self.render();
            }
        }
    }
}
