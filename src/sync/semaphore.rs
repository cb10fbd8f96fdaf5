//! Counting Semaphore
//!
//! Used for the exec/wait handshakes: the child `up`s after publishing its
//! load outcome or exit status, the parent `down`s before reading it.
//!
//! # Ordering
//! `up` releases, `down` acquires: everything written before an `up` is
//! visible after the matching `down` returns. This is the happens-before
//! edge the child-record protocol relies on.
//!
//! # Blocking
//! `down` yields to the scheduler between polls rather than spinning; the
//! wait completes only when the awaited `up` arrives (there is no
//! cancellation - a waiter abandoned by teardown simply never resumes).

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::sched::Scheduler;

/// A counting semaphore.
pub struct Semaphore {
    permits: AtomicUsize,
}

impl Semaphore {
    /// Create a semaphore with the given number of initial permits.
    pub const fn new(permits: usize) -> Self {
        Self {
            permits: AtomicUsize::new(permits),
        }
    }

    /// Release one permit, waking at most one `down`.
    pub fn up(&self) {
        self.permits.fetch_add(1, Ordering::Release);
    }

    /// Acquire one permit, blocking until one is available.
    pub fn down(&self, sched: &dyn Scheduler) {
        loop {
            if self.try_down() {
                return;
            }
            sched.yield_now();
        }
    }

    /// Acquire one permit without blocking. Returns whether one was taken.
    pub fn try_down(&self) -> bool {
        let mut current = self.permits.load(Ordering::Acquire);
        while current > 0 {
            match self.permits.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }
}
