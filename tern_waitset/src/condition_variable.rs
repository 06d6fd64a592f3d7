//! Process-shareable condition variable and its read/write handles.
//!
//! [`ConditionVariableData`] is a single cache line of atomics with no
//! pointers inside, so it can be placed in a shared mapping and used from
//! every process that maps it, whatever address the mapping lands at.
//!
//! ## Protocol
//!
//! The block behaves like a counting semaphore built on a futex word:
//!
//! - [`Signaler::notify_one`] increments the counter and wakes one blocked
//!   waiter (the wake syscall is skipped while nobody is blocked).
//! - [`Waiter::wait`] consumes one pending notification, blocking while
//!   there is none.
//! - [`Waiter::reset`] drains all pending notifications.
//!
//! Notifications are hints, not events: several of them may be consumed by
//! one scan of the wait set, and a wake may find nothing ready. Consumers
//! re-evaluate their conditions after every return.

use crate::platform::{BlockOutcome, futex_wait, futex_wake};
use static_assertions::const_assert_eq;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tern::consts::CACHE_LINE_SIZE;

/// Shared synchronization block of one wait set.
///
/// Zeroed memory is a valid, idle instance.
#[repr(C, align(64))]
pub struct ConditionVariableData {
    /// Pending notifications. Doubles as the futex word.
    semaphore: AtomicU32,
    /// Threads currently blocked on `semaphore`.
    waiters: AtomicU32,
    _padding: [u8; CACHE_LINE_SIZE - 8],
}

const_assert_eq!(core::mem::size_of::<ConditionVariableData>(), CACHE_LINE_SIZE);
const_assert_eq!(core::mem::align_of::<ConditionVariableData>(), CACHE_LINE_SIZE);

impl ConditionVariableData {
    /// Create an idle condition variable with no pending notification.
    pub const fn new() -> Self {
        Self {
            semaphore: AtomicU32::new(0),
            waiters: AtomicU32::new(0),
            _padding: [0; CACHE_LINE_SIZE - 8],
        }
    }

    /// Number of notifications not yet consumed by a waiter.
    pub fn pending_notifications(&self) -> u32 {
        self.semaphore.load(Ordering::Acquire)
    }

    /// Number of threads currently blocked in a [`Waiter`].
    pub fn blocked_waiters(&self) -> u32 {
        self.waiters.load(Ordering::Acquire)
    }
}

impl Default for ConditionVariableData {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConditionVariableData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionVariableData")
            .field("pending", &self.pending_notifications())
            .field("waiters", &self.blocked_waiters())
            .finish()
    }
}

/// How a timed wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeUp {
    /// A notification was consumed.
    Notified,
    /// The timeout elapsed without a notification.
    TimedOut,
}

/// Write-side handle of a [`ConditionVariableData`].
#[derive(Debug, Clone, Copy)]
pub struct Signaler<'a> {
    data: &'a ConditionVariableData,
}

impl<'a> Signaler<'a> {
    /// Bind a signaler to `data`.
    pub fn new(data: &'a ConditionVariableData) -> Self {
        Self { data }
    }

    /// Post one notification and wake a blocked waiter, if any.
    ///
    /// Never blocks and never fails. The counter saturates instead of
    /// wrapping, so a flood of notifications without a consumer cannot
    /// turn into "nothing pending".
    pub fn notify_one(&self) {
        // SeqCst pairs with the waiter's registration in `Waiter::block`:
        // either this load sees the waiter or the waiter sees the new count.
        let _ = self
            .data
            .semaphore
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
                Some(v.saturating_add(1))
            });
        if self.data.waiters.load(Ordering::SeqCst) > 0 {
            futex_wake(&self.data.semaphore, 1);
        }
    }
}

/// Read-side handle of a [`ConditionVariableData`].
///
/// Intended for a single consuming thread per condition variable.
#[derive(Debug, Clone, Copy)]
pub struct Waiter<'a> {
    data: &'a ConditionVariableData,
}

impl<'a> Waiter<'a> {
    /// Bind a waiter to `data`.
    pub fn new(data: &'a ConditionVariableData) -> Self {
        Self { data }
    }

    /// Drop all pending notifications.
    pub fn reset(&self) {
        self.data.semaphore.swap(0, Ordering::SeqCst);
    }

    /// Block until a notification is available, then consume it.
    pub fn wait(&self) {
        while !self.try_consume() {
            self.block(None);
        }
    }

    /// Like [`wait`](Self::wait), but give up after `timeout`.
    pub fn timed_wait(&self, timeout: Duration) -> WakeUp {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return WakeUp::Notified;
        };

        loop {
            if self.try_consume() {
                return WakeUp::Notified;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return WakeUp::TimedOut;
            }
            // A timeout here is re-examined above: a notification may have
            // raced with it.
            self.block(Some(remaining));
        }
    }

    fn try_consume(&self) -> bool {
        self.data
            .semaphore
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1))
            .is_ok()
    }

    fn block(&self, timeout: Option<Duration>) {
        self.data.waiters.fetch_add(1, Ordering::SeqCst);
        if self.data.semaphore.load(Ordering::SeqCst) == 0 {
            // Both outcomes are re-examined by the caller.
            let _: BlockOutcome = futex_wait(&self.data.semaphore, 0, timeout);
        }
        self.data.waiters.fetch_sub(1, Ordering::SeqCst);
    }
}
