//! Re-targeting smooth scroll.
//!
//! The destination is recomputed from the anchor's live position on every
//! frame, so content that materialises or grows during the flight moves the
//! destination with it and the animation converges on where the entry
//! actually ends up rather than where it was when the click happened.

use std::time::Duration;

use super::scanner::Anchor;
use super::schedule::{Scheduler, TimerId};
use crate::dom::Document;

/// Ease-out cubic: fast start, gentle landing.
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Scroll offset that puts `anchor` at the top of the container, past the
/// leading scroll padding, with `lead_in` of slack. `None` once the anchor
/// no longer resolves.
pub fn target_offset(doc: &Document, anchor: Anchor, lead_in: f32) -> Option<f32> {
    let top = anchor.top(doc)?;
    let viewport = doc.viewport();
    let raw = doc.scroll_top() + (top - viewport.top) - viewport.padding_top + lead_in;
    Some(raw.clamp(0.0, doc.max_scroll()))
}

#[derive(Debug, Clone)]
struct Flight {
    entry_id: String,
    anchor: Anchor,
    start_offset: f32,
    start_time: Duration,
    frame: TimerId,
}

/// What a frame did.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Still moving; another frame has been requested.
    InFlight { offset: f32 },
    /// Snapped onto the final position of `entry_id`.
    Landed { entry_id: String, offset: f32 },
    /// The target vanished mid-flight.
    Lost { entry_id: String },
    /// Not our frame (preempted flight or no flight at all).
    Stale,
}

/// Single-flight scroll animation.
#[derive(Debug)]
pub struct ScrollAnimator {
    duration: Duration,
    lead_in: f32,
    flight: Option<Flight>,
}

impl ScrollAnimator {
    pub fn new(duration: Duration, lead_in: f32) -> Self {
        Self {
            duration,
            lead_in,
            flight: None,
        }
    }

    pub fn is_animating(&self) -> bool {
        self.flight.is_some()
    }

    pub fn target(&self) -> Option<&str> {
        self.flight.as_ref().map(|f| f.entry_id.as_str())
    }

    /// Start flying towards `anchor`, preempting any flight in progress.
    /// The preempted flight's landing never happens.
    pub fn animate_to<T>(
        &mut self,
        entry_id: &str,
        anchor: Anchor,
        doc: &Document,
        sched: &mut Scheduler<T>,
        frame_task: T,
    ) {
        if let Some(prev) = self.flight.take() {
            sched.cancel(prev.frame);
            log::debug!("scroll to {} preempted by {}", prev.entry_id, entry_id);
        }
        let frame = sched.request_frame(frame_task);
        self.flight = Some(Flight {
            entry_id: entry_id.to_string(),
            anchor,
            start_offset: doc.scroll_top(),
            start_time: sched.now(),
            frame,
        });
    }

    /// Advance the flight for the frame `id`. The animator's own scroll
    /// writes are drained from the document so they never reach scroll
    /// observers.
    pub fn on_frame<T>(
        &mut self,
        id: TimerId,
        doc: &mut Document,
        sched: &mut Scheduler<T>,
        frame_task: T,
    ) -> FrameOutcome {
        let Some(flight) = self.flight.as_mut() else {
            return FrameOutcome::Stale;
        };
        if flight.frame != id {
            return FrameOutcome::Stale;
        }

        let Some(target) = target_offset(doc, flight.anchor, self.lead_in) else {
            let entry_id = flight.entry_id.clone();
            self.flight = None;
            return FrameOutcome::Lost { entry_id };
        };

        let elapsed = sched.now().saturating_sub(flight.start_time);
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
        };

        if progress < 1.0 {
            let offset = flight.start_offset + (target - flight.start_offset) * ease_out_cubic(progress);
            let applied = doc.scroll_to(offset);
            doc.take_scrolls();
            flight.frame = sched.request_frame(frame_task);
            return FrameOutcome::InFlight { offset: applied };
        }

        // progress hit 1: snap onto the freshly sampled target
        let entry_id = flight.entry_id.clone();
        self.flight = None;
        let applied = doc.scroll_to(target);
        doc.take_scrolls();
        FrameOutcome::Landed {
            entry_id,
            offset: applied,
        }
    }

    /// Drop the flight without landing it.
    pub fn cancel<T>(&mut self, sched: &mut Scheduler<T>) -> Option<String> {
        let flight = self.flight.take()?;
        sched.cancel(flight.frame);
        Some(flight.entry_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NavigatorConfig;
    use crate::engine::scanner::{Outline, Scanner};

    const FRAME: Duration = Duration::from_millis(16);

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    fn transcript() -> String {
        let turns: String = (1..=6)
            .map(|n| {
                format!(
                    r#"<article data-testid="conversation-turn-{n}" data-turn="user" style="height: 500px"><div class="whitespace-pre-wrap">q{n}</div></article>"#
                )
            })
            .collect();
        format!("<html><body><main>{turns}</main></body></html>")
    }

    fn setup() -> (Document, Outline, Scheduler<&'static str>, ScrollAnimator) {
        let doc = Document::from_html(&transcript(), "https://chatgpt.com/c/t");
        let outline = Scanner::from_config(&NavigatorConfig::default())
            .unwrap()
            .scan(&doc, None);
        (
            doc,
            outline,
            Scheduler::new(FRAME),
            ScrollAnimator::new(Duration::from_millis(500), 20.0),
        )
    }

    /// Pump frames until the flight ends; `perturb` runs before each frame.
    fn fly(
        doc: &mut Document,
        sched: &mut Scheduler<&'static str>,
        animator: &mut ScrollAnimator,
        mut perturb: impl FnMut(&mut Document, Duration),
    ) -> FrameOutcome {
        let mut last = FrameOutcome::Stale;
        while let Some((id, _)) = sched.pop_due(Duration::from_secs(10)) {
            perturb(doc, sched.now());
            last = animator.on_frame(id, doc, sched, "frame");
        }
        last
    }

    #[test]
    fn easing_is_monotonic_and_bounded() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(2.0), 1.0);
        let mut prev = 0.0;
        for i in 1..=100 {
            let v = ease_out_cubic(i as f32 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
        assert!(ease_out_cubic(0.5) > 0.5);
    }

    #[test]
    fn lands_on_target_and_drains_own_scroll_events() {
        let (mut doc, outline, mut sched, mut animator) = setup();
        let entry = &outline.entries()[3];
        let expected = target_offset(&doc, entry.anchor, 20.0).unwrap();

        animator.animate_to(&entry.id, entry.anchor, &doc, &mut sched, "frame");
        assert!(animator.is_animating());
        assert_eq!(animator.target(), Some(entry.id.as_str()));

        match fly(&mut doc, &mut sched, &mut animator, |_, _| {}) {
            FrameOutcome::Landed { entry_id, offset } => {
                assert_eq!(entry_id, entry.id);
                assert!(close(offset, expected));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(close(doc.scroll_top(), expected));
        assert_eq!(doc.take_scrolls(), 0);
        assert!(!animator.is_animating());
        assert!(sched.now() >= Duration::from_millis(500));
    }

    #[test]
    fn converges_on_target_that_moves_mid_flight() {
        let (mut doc, outline, mut sched, mut animator) = setup();
        let entry = outline.entries()[4].clone();
        let first = outline.entries()[0].anchor.node();
        let stale_target = target_offset(&doc, entry.anchor, 20.0).unwrap();

        animator.animate_to(&entry.id, entry.anchor, &doc, &mut sched, "frame");
        let mut grown = false;
        let outcome = fly(&mut doc, &mut sched, &mut animator, |doc, now| {
            if !grown && now >= Duration::from_millis(200) {
                // lazy content above the target materialises
                doc.set_node_style(first, "height: 900px");
                grown = true;
            }
        });

        let final_target = target_offset(&doc, entry.anchor, 20.0).unwrap();
        assert!(close(final_target - stale_target, 400.0));
        assert!(close(doc.scroll_top(), final_target));
        assert!(matches!(outcome, FrameOutcome::Landed { .. }));
    }

    #[test]
    fn new_flight_preempts_old_one() {
        let (mut doc, outline, mut sched, mut animator) = setup();
        let a = &outline.entries()[1];
        let b = &outline.entries()[5];

        animator.animate_to(&a.id, a.anchor, &doc, &mut sched, "frame");
        let (first_frame, _) = sched.pop_due(Duration::from_secs(1)).unwrap();
        animator.on_frame(first_frame, &mut doc, &mut sched, "frame");

        animator.animate_to(&b.id, b.anchor, &doc, &mut sched, "frame");
        assert_eq!(sched.pending(), 1);
        assert_eq!(
            animator.on_frame(first_frame, &mut doc, &mut sched, "frame"),
            FrameOutcome::Stale
        );

        match fly(&mut doc, &mut sched, &mut animator, |_, _| {}) {
            FrameOutcome::Landed { entry_id, .. } => assert_eq!(entry_id, b.id),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn vanished_target_is_lost() {
        let (mut doc, outline, mut sched, mut animator) = setup();
        let entry = &outline.entries()[2];
        animator.animate_to(&entry.id, entry.anchor, &doc, &mut sched, "frame");
        doc.reload(&transcript());
        let outcome = fly(&mut doc, &mut sched, &mut animator, |_, _| {});
        assert_eq!(
            outcome,
            FrameOutcome::Lost {
                entry_id: entry.id.clone()
            }
        );
        assert!(!animator.is_animating());
    }

    #[test]
    fn cancel_drops_the_frame() {
        let (doc, outline, mut sched, mut animator) = setup();
        let entry = &outline.entries()[2];
        animator.animate_to(&entry.id, entry.anchor, &doc, &mut sched, "frame");
        assert_eq!(animator.cancel(&mut sched), Some(entry.id.clone()));
        assert_eq!(sched.pending(), 0);
        assert_eq!(animator.cancel(&mut sched), None);
    }
}
