// Timer primitives on the glib main loop.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::scheduler::{Scheduler, TimerHandle, TimerId};

type FiredCallback = Rc<dyn Fn(TimerId)>;

#[derive(Default)]
struct Inner {
    next_id: Cell<u64>,
    sources: RefCell<HashMap<TimerId, glib::SourceId>>,
    on_fired: RefCell<Option<FiredCallback>>,
}

impl Inner {
    fn next_id(&self) -> TimerId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        TimerId(id)
    }

    fn fire(&self, id: TimerId) {
        // Clone out so the callback can re-enter the scheduler.
        let callback = self.on_fired.borrow().clone();
        if let Some(callback) = callback {
            callback(id);
        }
    }
}

/// [`Scheduler`] backed by `glib::timeout_add_local*`. Firings are reported
/// through [`GlibScheduler::connect_fired`].
#[derive(Clone, Default)]
pub struct GlibScheduler {
    inner: Rc<Inner>,
}

impl GlibScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_fired<F: Fn(TimerId) + 'static>(&self, callback: F) {
        *self.inner.on_fired.borrow_mut() = Some(Rc::new(callback));
    }

    fn downgrade(&self) -> Weak<Inner> {
        Rc::downgrade(&self.inner)
    }
}

impl Scheduler for GlibScheduler {
    fn schedule_once(&self, delay: Duration) -> TimerHandle {
        let id = self.inner.next_id();
        let weak = self.downgrade();
        let source = glib::timeout_add_local_once(delay, move || {
            if let Some(inner) = weak.upgrade() {
                // glib drops the source after this returns.
                inner.sources.borrow_mut().remove(&id);
                inner.fire(id);
            }
        });
        self.inner.sources.borrow_mut().insert(id, source);
        tracing::trace!(%id, ?delay, "One-shot timer armed");
        TimerHandle::new(id)
    }

    fn schedule_repeating(&self, interval: Duration) -> TimerHandle {
        let id = self.inner.next_id();
        let weak = self.downgrade();
        let source = glib::timeout_add_local(interval, move || match weak.upgrade() {
            Some(inner) => {
                inner.fire(id);
                glib::ControlFlow::Continue
            }
            None => glib::ControlFlow::Break,
        });
        self.inner.sources.borrow_mut().insert(id, source);
        tracing::trace!(%id, ?interval, "Repeating timer armed");
        TimerHandle::new(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        let source = self.inner.sources.borrow_mut().remove(&handle.id());
        if let Some(source) = source {
            source.remove();
            tracing::trace!(id = %handle.id(), "Timer cancelled");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for (_, source) in self.sources.get_mut().drain() {
            source.remove();
        }
    }
}
