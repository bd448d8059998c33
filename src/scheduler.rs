// ============================================================================
// SCHEDULER - cooperative timers and redraw coalescing
// ============================================================================
//
// Nothing here spawns threads.  The owner drives both types from its event
// loop by passing the current `Instant`.

use std::time::{Duration, Instant};

/// Delayed tasks, returned to the owner once due.
pub struct Scheduler<T> {
    pending: Vec<(Instant, T)>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self { pending: Vec::new() }
    }
}

impl<T: PartialEq> Scheduler<T> {
    pub fn schedule(&mut self, at: Instant, task: T) {
        self.pending.push((at, task));
    }

    /// Replace any pending copy of `task` so it fires only at `at`.
    pub fn reschedule(&mut self, at: Instant, task: T) {
        self.cancel(&task);
        self.schedule(at, task);
    }

    pub fn cancel(&mut self, task: &T) {
        self.pending.retain(|(_, t)| t != task);
    }

    pub fn is_pending(&self, task: &T) -> bool {
        self.pending.iter().any(|(_, t)| t == task)
    }

    /// Remove and return every task due at `now`, earliest first.
    pub fn run_due(&mut self, now: Instant) -> Vec<T> {
        let (mut due, rest): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|(at, _)| *at <= now);
        self.pending = rest;
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, t)| t).collect()
    }
}

/// Dirty flag with a rate limit for high-frequency sources (zoom, pan).
///
/// A throttled request is not lost: it stays pending and `tick` promotes it
/// once the interval has elapsed.
pub struct RedrawThrottle {
    interval: Duration,
    last: Option<Instant>,
    dirty: bool,
    pending: bool,
}

impl RedrawThrottle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None, dirty: false, pending: false }
    }

    /// Content changes: always redraw.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Rate-limited request.
    pub fn request(&mut self, now: Instant) {
        let ready = self.last.is_none_or(|last| now.duration_since(last) >= self.interval);
        if ready {
            self.dirty = true;
            self.pending = false;
            self.last = Some(now);
        } else {
            self.pending = true;
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if self.pending {
            self.request(now);
        }
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
