//! Timer primitives for the preview core.
//!
//! Two kinds of timers exist: one-shot (animation frames, each firing arms at
//! most the next frame) and repeating (playback position polling). Firings
//! are not callbacks into controllers; the host delivers them to the slot as
//! [`crate::slot::SlotEvent::TimerFired`] and the slot routes them by id.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Identifies a timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Owned handle to an armed timer. Not `Clone`: whoever holds it is the only
/// party allowed to cancel the timer.
#[derive(Debug, PartialEq, Eq)]
pub struct TimerHandle {
    id: TimerId,
}

impl TimerHandle {
    pub fn new(id: TimerId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }
}

pub trait Scheduler {
    /// Fire once after `delay`.
    fn schedule_once(&self, delay: Duration) -> TimerHandle;

    /// Fire every `interval` until cancelled.
    fn schedule_repeating(&self, interval: Duration) -> TimerHandle;

    /// Release a timer. Cancelling a one-shot that already fired is a no-op.
    fn cancel(&self, handle: TimerHandle);
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    deadline: Duration,
    delay: Duration,
    repeating: bool,
}

#[derive(Default)]
struct ManualInner {
    now: Duration,
    next_id: u64,
    armed: BTreeMap<TimerId, ArmedTimer>,
}

/// Deterministic scheduler driven by hand.
///
/// Time only moves when [`ManualScheduler::fire_next`] is called. Used by the
/// tests and by headless embedders that pump their own clock.
#[derive(Default)]
pub struct ManualScheduler {
    inner: RefCell<ManualInner>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Advance to the earliest armed deadline and fire that timer.
    ///
    /// One-shots are disarmed, repeating timers re-armed one interval later.
    /// Ties fire in arming order.
    pub fn fire_next(&self) -> Option<TimerId> {
        let mut inner = self.inner.borrow_mut();
        let (id, timer) = inner
            .armed
            .iter()
            .min_by_key(|(id, timer)| (timer.deadline, **id))
            .map(|(id, timer)| (*id, *timer))?;

        inner.now = inner.now.max(timer.deadline);
        if timer.repeating {
            let next = ArmedTimer {
                deadline: timer.deadline + timer.delay,
                ..timer
            };
            inner.armed.insert(id, next);
        } else {
            inner.armed.remove(&id);
        }
        Some(id)
    }

    pub fn armed_count(&self) -> usize {
        self.inner.borrow().armed.len()
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.inner.borrow().armed.contains_key(&id)
    }

    /// Delay or interval a live timer was armed with.
    pub fn delay_of(&self, id: TimerId) -> Option<Duration> {
        self.inner.borrow().armed.get(&id).map(|t| t.delay)
    }

    /// Whether a live timer repeats.
    pub fn is_repeating(&self, id: TimerId) -> Option<bool> {
        self.inner.borrow().armed.get(&id).map(|t| t.repeating)
    }

    fn arm(&self, delay: Duration, repeating: bool) -> TimerHandle {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = TimerId(inner.next_id);
        let deadline = inner.now + delay;
        inner.armed.insert(
            id,
            ArmedTimer {
                deadline,
                delay,
                repeating,
            },
        );
        TimerHandle::new(id)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, delay: Duration) -> TimerHandle {
        self.arm(delay, false)
    }

    fn schedule_repeating(&self, interval: Duration) -> TimerHandle {
        self.arm(interval, true)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.inner.borrow_mut().armed.remove(&handle.id());
    }
}
