//! Cooperative timers on a virtual clock, plus the debounce and throttle
//! wrappers built on them.
//!
//! Nothing here runs concurrently: the owner pops due timers one at a time
//! and handles each to completion before asking for the next.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Timer queue keyed by deadline; equal deadlines fire in scheduling order.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    frame_interval: Duration,
    queue: BTreeMap<(Duration, u64), T>,
    deadlines: HashMap<u64, Duration>,
}

impl<T> Scheduler<T> {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            frame_interval: frame_interval.max(Duration::from_millis(1)),
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn set_timeout(&mut self, delay: Duration, task: T) -> TimerId {
        self.schedule_at(self.now + delay, task)
    }

    /// Fire `task` at the next frame boundary.
    pub fn request_frame(&mut self, task: T) -> TimerId {
        let interval = self.frame_interval.as_nanos();
        let elapsed = self.now.as_nanos();
        let next = (elapsed / interval + 1) * interval;
        let at = Duration::from_nanos(u64::try_from(next).unwrap_or(u64::MAX));
        self.schedule_at(at, task)
    }

    fn schedule_at(&mut self, at: Duration, task: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.insert((at, id), task);
        self.deadlines.insert(id, at);
        TimerId(id)
    }

    /// Cancel a pending timer. Returns false if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id.0) {
            Some(at) => self.queue.remove(&(at, id.0)).is_some(),
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(at, _)| *at)
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its deadline.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, T)> {
        let (&(at, id), _) = self.queue.iter().next()?;
        if at > until {
            return None;
        }
        let task = self.queue.remove(&(at, id))?;
        self.deadlines.remove(&id);
        self.now = self.now.max(at);
        Some((TimerId(id), task))
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, at: Duration) {
        self.now = self.now.max(at);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.deadlines.clear();
    }
}

/// Coalesces bursts of calls into one trailing call carrying the latest
/// arguments, fired once the calls have been quiet for `delay`.
#[derive(Debug)]
pub struct Debounce<A> {
    delay: Duration,
    pending: Option<TimerId>,
    latest: Option<A>,
}

impl<A> Debounce<A> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            latest: None,
        }
    }

    /// Restart the quiet period; `task` is what the scheduler hands back
    /// when it elapses.
    pub fn call<T>(&mut self, sched: &mut Scheduler<T>, task: T, args: A) {
        if let Some(id) = self.pending.take() {
            sched.cancel(id);
        }
        self.latest = Some(args);
        self.pending = Some(sched.set_timeout(self.delay, task));
    }

    /// Claim the arguments of a fired timer. Stale timers (superseded or
    /// cancelled) yield nothing.
    pub fn fire(&mut self, id: TimerId) -> Option<A> {
        if self.pending != Some(id) {
            return None;
        }
        self.pending = None;
        self.latest.take()
    }

    pub fn cancel<T>(&mut self, sched: &mut Scheduler<T>) {
        if let Some(id) = self.pending.take() {
            sched.cancel(id);
        }
        self.latest = None;
    }
}

/// Rate cap: admits a call only if `interval` has elapsed since the last
/// admitted one. Dropped calls are gone; there is no trailing call.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Duration>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn admit(&mut self, now: Duration) -> bool {
        let ready = match self.last {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.interval,
        };
        if ready {
            self.last = Some(now);
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let mut sched = Scheduler::new(ms(16));
        sched.set_timeout(ms(30), "late");
        sched.set_timeout(ms(10), "early");
        sched.set_timeout(ms(10), "early-second");

        let fired: Vec<_> = std::iter::from_fn(|| sched.pop_due(ms(100)).map(|(_, t)| t)).collect();
        assert_eq!(fired, vec!["early", "early-second", "late"]);
        assert_eq!(sched.now(), ms(30));
    }

    #[test]
    fn pop_due_respects_horizon() {
        let mut sched = Scheduler::new(ms(16));
        sched.set_timeout(ms(50), ());
        assert!(sched.pop_due(ms(49)).is_none());
        assert!(sched.pop_due(ms(50)).is_some());
    }

    #[test]
    fn frames_align_to_interval() {
        let mut sched = Scheduler::new(ms(16));
        sched.advance_to(ms(5));
        sched.request_frame(());
        assert_eq!(sched.next_deadline(), Some(ms(16)));
        sched.pop_due(ms(16));
        sched.request_frame(());
        assert_eq!(sched.next_deadline(), Some(ms(32)));
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut sched = Scheduler::new(ms(16));
        let id = sched.set_timeout(ms(10), ());
        assert!(sched.cancel(id));
        assert!(!sched.cancel(id));
        assert!(sched.pop_due(ms(100)).is_none());
    }

    #[test]
    fn debounce_keeps_only_the_last_call() {
        let mut sched = Scheduler::new(ms(16));
        let mut debounce = Debounce::new(ms(200));

        debounce.call(&mut sched, "tick", 1);
        sched.advance_to(ms(150));
        debounce.call(&mut sched, "tick", 2);
        sched.advance_to(ms(300));
        debounce.call(&mut sched, "tick", 3);
        assert_eq!(sched.pending(), 1);

        assert!(sched.pop_due(ms(499)).is_none());
        let (id, _) = sched.pop_due(ms(500)).unwrap();
        assert_eq!(debounce.fire(id), Some(3));
        assert_eq!(debounce.fire(id), None);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn debounce_ignores_foreign_timers() {
        let mut sched = Scheduler::new(ms(16));
        let mut debounce: Debounce<()> = Debounce::new(ms(10));
        let other = sched.set_timeout(ms(1), "other");
        debounce.call(&mut sched, "mine", ());
        assert_eq!(debounce.fire(other), None);
        assert_eq!(sched.pending(), 2);
        debounce.cancel(&mut sched);
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn throttle_drops_calls_inside_interval() {
        let mut throttle = Throttle::new(ms(100));
        assert!(throttle.admit(ms(0)));
        assert!(!throttle.admit(ms(50)));
        assert!(!throttle.admit(ms(99)));
        assert!(throttle.admit(ms(100)));
        assert!(!throttle.admit(ms(150)));
        assert!(throttle.admit(ms(250)));
    }
}
