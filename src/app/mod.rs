//! `Navigator`: the panel controller.
//!
//! This module declares the `Navigator` struct and its constructor. The
//! methods are split across the sibling sub-modules:
//!
//! - `lifecycle`: mount, teardown, the event pump and timer dispatch
//! - `gestures`: clicks, hover, search, rename and collapse
//! - `summary`: AI labels through the background worker

pub mod gestures;
pub mod lifecycle;
pub mod summary;

use url::Url;

use crate::config::{ConfigError, NavigatorConfig};
use crate::dom::Document;
use crate::engine::animator::ScrollAnimator;
use crate::engine::reconciler::{ReconcileStats, Reconciler};
use crate::engine::scanner::{Outline, Scanner};
use crate::engine::schedule::{Debounce, Scheduler, Throttle, TimerId};
use crate::engine::state::PanelState;
use crate::engine::tracker::ActiveTracker;
use crate::net::bridge::SummaryChannel;
use crate::store::{LabelBook, LabelStore};

/// Work the scheduler hands back to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Mount,
    Refresh,
    Search,
    Frame,
    Tooltip(String),
}

/// Conversation id from a `/c/<id>` location.
pub fn conversation_id(location: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    let mut segments = url.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "c" {
            return segments
                .next()
                .filter(|id| !id.is_empty())
                .map(str::to_string);
        }
    }
    None
}

pub struct Navigator {
    pub(crate) config: NavigatorConfig,
    pub(crate) doc: Document,
    pub(crate) sched: Scheduler<Task>,
    pub(crate) scanner: Scanner,
    pub(crate) tracker: ActiveTracker,
    pub(crate) animator: ScrollAnimator,
    pub(crate) reconciler: Reconciler,
    pub(crate) outline: Outline,
    pub(crate) state: PanelState,
    pub(crate) labels: LabelBook,
    pub(crate) store: Box<dyn LabelStore>,
    pub(crate) summarizer: Box<dyn SummaryChannel>,
    pub(crate) refresh_debounce: Debounce<()>,
    pub(crate) search_debounce: Debounce<String>,
    pub(crate) scroll_throttle: Throttle,
    pub(crate) tooltip_timer: Option<TimerId>,
    pub(crate) mount_timer: Option<TimerId>,
    pub(crate) mounted: bool,
}

impl Navigator {
    pub fn new(
        config: NavigatorConfig,
        doc: Document,
        store: Box<dyn LabelStore>,
        summarizer: Box<dyn SummaryChannel>,
    ) -> Result<Self, ConfigError> {
        let scanner = Scanner::from_config(&config)?;
        Ok(Self {
            sched: Scheduler::new(config.frame_interval()),
            tracker: ActiveTracker::new(config.activation_threshold),
            animator: ScrollAnimator::new(config.scroll_duration(), config.scroll_lead_in),
            refresh_debounce: Debounce::new(config.mutation_debounce()),
            search_debounce: Debounce::new(config.debounce()),
            scroll_throttle: Throttle::new(config.throttle()),
            reconciler: Reconciler::new(),
            outline: Outline::default(),
            state: PanelState::default(),
            labels: LabelBook::default(),
            tooltip_timer: None,
            mount_timer: None,
            mounted: false,
            scanner,
            config,
            doc,
            store,
            summarizer,
        })
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The host page; edits made here are observed on the next pump.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn labels(&self) -> &LabelBook {
        &self.labels
    }

    pub fn stats(&self) -> ReconcileStats {
        self.reconciler.stats()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn panel_html(&self) -> Option<&str> {
        self.doc.panel_html()
    }

    /// Rescan and render, unless an interaction or flight holds it off.
    pub(crate) fn refresh(&mut self) -> bool {
        self.reconciler.refresh(
            &mut self.doc,
            &mut self.scanner,
            &self.tracker,
            &mut self.outline,
            &mut self.state,
            &self.labels,
            self.config.rename_max_len,
        )
    }

    /// Render the current state without rescanning.
    pub(crate) fn render(&mut self) -> bool {
        self.reconciler.render(
            &mut self.doc,
            &self.outline,
            &self.state,
            &self.labels,
            self.config.rename_max_len,
        )
    }

    /// Refresh, or render the state alone when a refresh is held off.
    /// Controller paths that change state must show it either way.
    pub(crate) fn refresh_or_render(&mut self) {
        if !self.refresh() {
            self.render();
        }
    }

    /// Reload the label view when the location names a different
    /// conversation than the one loaded.
    pub(crate) fn sync_conversation(&mut self) -> bool {
        let conversation = conversation_id(self.doc.location());
        if conversation.as_deref() == self.labels.conversation() {
            return false;
        }
        let labels = match conversation.as_deref() {
            Some(id) => self.store.get(id).unwrap_or_else(|e| {
                log::warn!("could not load labels for {}: {}", id, e);
                Default::default()
            }),
            None => Default::default(),
        };
        log::info!(
            "conversation {} ({} label(s))",
            conversation.as_deref().unwrap_or("<none>"),
            labels.len()
        );
        self.labels = LabelBook::new(conversation, labels);
        self.outline = Outline::default();
        if self.state.editing_entry_id().is_some() {
            self.state.interaction = Default::default();
        }
        true
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::net::bridge::{SummaryReply, SummaryRequest};
    use crate::net::summarize::SummarizeError;
    use crate::store::{MemoryStore, StoreError};

    pub const LOCATION: &str = "https://chatgpt.com/c/abc123";

    pub fn turn(n: usize, text: &str) -> String {
        if n % 2 == 1 {
            format!(
                r#"<article data-testid="conversation-turn-{n}" data-turn="user" style="height: 400px"><div data-message-author-role="user"><div class="whitespace-pre-wrap">{text}</div></div></article>"#
            )
        } else {
            format!(
                r#"<article data-testid="conversation-turn-{n}" data-turn="assistant" style="height: 400px"><div data-message-author-role="assistant"><p>{text}</p></div></article>"#
            )
        }
    }

    /// `questions` question/answer pairs.
    pub fn transcript(questions: usize) -> String {
        let turns: String = (1..=questions * 2)
            .map(|n| {
                if n % 2 == 1 {
                    turn(n, &format!("question {}", n / 2 + 1))
                } else {
                    turn(n, &format!("answer {}", n / 2))
                }
            })
            .collect();
        format!("<html><body><main>{turns}</main></body></html>")
    }

    #[derive(Clone, Default)]
    pub struct Scripted {
        pub sent: Rc<RefCell<Vec<SummaryRequest>>>,
        pub replies: Rc<RefCell<VecDeque<SummaryReply>>>,
    }

    impl SummaryChannel for Scripted {
        fn send(&mut self, request: SummaryRequest) -> Result<(), SummarizeError> {
            self.sent.borrow_mut().push(request);
            Ok(())
        }

        fn try_recv(&mut self) -> Option<SummaryReply> {
            self.replies.borrow_mut().pop_front()
        }
    }

    /// Shares its contents with the test through `Rc`.
    #[derive(Clone, Default)]
    pub struct SharedStore(pub Rc<RefCell<MemoryStore>>);

    impl LabelStore for SharedStore {
        fn get(&self, conversation: &str) -> Result<HashMap<String, String>, StoreError> {
            self.0.borrow().get(conversation)
        }

        fn set(&mut self, conversation: &str, entry: &str, label: Option<&str>) -> Result<(), StoreError> {
            self.0.borrow_mut().set(conversation, entry, label)
        }

        fn collapsed(&self) -> Result<bool, StoreError> {
            self.0.borrow().collapsed()
        }

        fn set_collapsed(&mut self, collapsed: bool) -> Result<(), StoreError> {
            self.0.borrow_mut().set_collapsed(collapsed)
        }
    }

    pub struct BrokenStore;

    impl LabelStore for BrokenStore {
        fn get(&self, _: &str) -> Result<HashMap<String, String>, StoreError> {
            Err(StoreError::Unavailable("storage disabled".into()))
        }

        fn set(&mut self, _: &str, _: &str, _: Option<&str>) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("storage disabled".into()))
        }

        fn collapsed(&self) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("storage disabled".into()))
        }

        fn set_collapsed(&mut self, _: bool) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("storage disabled".into()))
        }
    }

    pub fn navigator_with(
        html: &str,
        store: Box<dyn LabelStore>,
        summarizer: Box<dyn SummaryChannel>,
    ) -> Navigator {
        let doc = Document::from_html(html, LOCATION);
        Navigator::new(NavigatorConfig::default(), doc, store, summarizer).unwrap()
    }

    /// A started and settled navigator over `questions` Q/A pairs.
    pub fn mounted(questions: usize) -> Navigator {
        let mut nav = navigator_with(
            &transcript(questions),
            Box::new(MemoryStore::new()),
            Box::new(Scripted::default()),
        );
        nav.start();
        nav.run_until_idle();
        nav
    }

    pub fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }
}
