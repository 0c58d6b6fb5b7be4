use std::time::Duration;

use foundation::time::Time;

use crate::timers::{TimerId, TimerQueue};

/// Trailing-edge debounce over a [`TimerQueue`].
///
/// Every [`Debouncer::trigger`] pushes the deadline to `now + delay`; the
/// action fires once, from [`Debouncer::poll`], after a quiet period of
/// `delay`. N triggers inside the window collapse into one firing.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    timers: TimerQueue<()>,
    pending: Option<TimerId>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: TimerQueue::new(),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arms the debouncer, cancelling and rescheduling any pending firing.
    pub fn trigger(&mut self, now: Time) {
        let deadline = now.after(self.delay);
        match self.pending {
            Some(id) if self.timers.reschedule(id, deadline) => {}
            _ => self.pending = Some(self.timers.schedule(deadline, ())),
        }
    }

    /// Returns `true` exactly once per quiet period that has elapsed by `now`.
    pub fn poll(&mut self, now: Time) -> bool {
        if self.pending.is_none() {
            return false;
        }
        if self.timers.advance_to(now).is_empty() {
            return false;
        }
        self.pending = None;
        true
    }

    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(id) => self.timers.cancel(id),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Time> {
        self.pending.and_then(|id| self.timers.deadline(id))
    }
}

/// Leading-edge throttle: lets one call through, then blocks for `window`.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    open_at: Option<Time>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            open_at: None,
        }
    }

    /// Returns `true` if the caller may run now.
    pub fn try_acquire(&mut self, now: Time) -> bool {
        if let Some(open_at) = self.open_at
            && now < open_at
        {
            return false;
        }
        self.open_at = Some(now.after(self.window));
        true
    }

    pub fn reset(&mut self) {
        self.open_at = None;
    }
}
