//! Bounded multiplexer over attached conditions.
//!
//! ## State
//!
//! The attached set is a fixed-capacity array of condition references kept in
//! attach order. It never allocates. Every attached condition is bound to the
//! wait set's [`ConditionVariableData`], so whichever producer becomes ready
//! wakes the single consumer blocked in [`WaitSet::wait`] or
//! [`WaitSet::timed_wait`].
//!
//! ## Wait algorithm
//!
//! 1. Drain stale notifications ([`Waiter::reset`]).
//! 2. Scan every attached condition; return the ready ones if any.
//! 3. Otherwise block on the waiter and go back to 2.
//!
//! Readiness is level-triggered. Draining happens before the first scan, so
//! a producer that set its flag before the drain is seen by the scan, and a
//! producer that notifies after it leaves a pending notification that ends
//! the block. Spurious wakes only cost another scan.

use crate::condition::Condition;
use crate::condition_variable::{ConditionVariableData, WakeUp, Waiter};
use std::ptr;
use std::time::{Duration, Instant};
use tern::consts::MAX_NUMBER_OF_CONDITIONS;
use tracing::{debug, trace, warn};

/// Ordered, fixed-capacity sequence of condition handles.
pub type ConditionVector<'a, const CAPACITY: usize> = heapless::Vec<&'a dyn Condition<'a>, CAPACITY>;

/// Bounded registry of conditions sharing one condition variable.
///
/// Attach, detach and clear never block. Only the wait calls suspend, and
/// they never change the attached set. `&mut self` on every operation keeps
/// a single mutator and a single consumer per wait set.
///
/// Dropping the wait set detaches every remaining condition.
pub struct WaitSet<'a, const CAPACITY: usize = MAX_NUMBER_OF_CONDITIONS> {
    condition_variable: &'a ConditionVariableData,
    conditions: ConditionVector<'a, CAPACITY>,
}

impl<'a, const CAPACITY: usize> WaitSet<'a, CAPACITY> {
    /// Create an empty wait set over `condition_variable`.
    pub fn new(condition_variable: &'a ConditionVariableData) -> Self {
        Self {
            condition_variable,
            conditions: heapless::Vec::new(),
        }
    }

    /// Attach `condition` and bind it to this wait set's condition variable.
    ///
    /// Fails without any effect if the condition is already in this set, if
    /// the set is full, or if the condition is still bound to another
    /// condition variable.
    pub fn attach_condition(&mut self, condition: &'a dyn Condition<'a>) -> bool {
        if self.contains(condition) {
            debug!("attach rejected: condition already attached");
            return false;
        }
        if self.conditions.is_full() {
            debug!(capacity = CAPACITY, "attach rejected: wait set is full");
            return false;
        }
        if !condition.attach_condition_variable(self.condition_variable) {
            debug!("attach rejected: condition is bound to another condition variable");
            return false;
        }
        if self.conditions.push(condition).is_err() {
            condition.detach_condition_variable();
            return false;
        }
        trace!(size = self.conditions.len(), "condition attached");
        true
    }

    /// Remove `condition` from the set and unbind it.
    ///
    /// Fails without any effect if the condition is not in this set.
    pub fn detach_condition(&mut self, condition: &dyn Condition<'a>) -> bool {
        let Some(index) = self.position(condition) else {
            debug!("detach rejected: condition not attached");
            return false;
        };
        let removed = self.conditions.remove(index);
        removed.detach_condition_variable();
        trace!(size = self.conditions.len(), "condition detached");
        true
    }

    /// Detach every condition.
    pub fn clear(&mut self) {
        for condition in self.conditions.iter() {
            condition.detach_condition_variable();
        }
        self.conditions.clear();
    }

    /// Block until at least one attached condition is ready and return all
    /// ready conditions in attach order.
    ///
    /// Returns an empty sequence immediately if nothing is attached.
    pub fn wait(&mut self) -> ConditionVector<'a, CAPACITY> {
        if self.conditions.is_empty() {
            warn!("wait called on an empty wait set");
            return heapless::Vec::new();
        }
        self.wait_until(None)
    }

    /// Like [`wait`](Self::wait), but return by `timeout` after the call at
    /// the latest. The result is empty if nothing became ready in time.
    ///
    /// A zero timeout returns an empty sequence without blocking or scanning.
    pub fn timed_wait(&mut self, timeout: Duration) -> ConditionVector<'a, CAPACITY> {
        if timeout.is_zero() {
            return heapless::Vec::new();
        }
        // Unrepresentable deadlines degrade to an unbounded wait.
        let deadline = Instant::now().checked_add(timeout);
        self.wait_until(deadline)
    }

    /// Whether `condition` is in the attached set.
    pub fn contains(&self, condition: &dyn Condition<'a>) -> bool {
        self.position(condition).is_some()
    }

    /// Number of attached conditions.
    pub fn size(&self) -> usize {
        self.conditions.len()
    }

    /// Whether no condition is attached.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Maximum number of attached conditions.
    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    /// The condition variable shared by all attached conditions.
    pub fn condition_variable(&self) -> &'a ConditionVariableData {
        self.condition_variable
    }

    fn position(&self, condition: &dyn Condition<'a>) -> Option<usize> {
        self.conditions
            .iter()
            .position(|attached| ptr::addr_eq(ptr::from_ref(*attached), ptr::from_ref(condition)))
    }

    fn collect_triggered(&self) -> ConditionVector<'a, CAPACITY> {
        let mut ready = heapless::Vec::new();
        // Same capacity as the attached set, so the extend cannot overflow.
        ready.extend(
            self.conditions
                .iter()
                .copied()
                .filter(|condition| condition.has_trigger()),
        );
        ready
    }

    fn wait_until(&self, deadline: Option<Instant>) -> ConditionVector<'a, CAPACITY> {
        let waiter = Waiter::new(self.condition_variable);
        waiter.reset();

        loop {
            let ready = self.collect_triggered();
            if !ready.is_empty() {
                trace!(ready = ready.len(), "wait set woke");
                return ready;
            }

            match deadline {
                None => waiter.wait(),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() || waiter.timed_wait(remaining) == WakeUp::TimedOut {
                        trace!("wait set timed out");
                        return self.collect_triggered();
                    }
                }
            }
        }
    }
}

impl<const CAPACITY: usize> Drop for WaitSet<'_, CAPACITY> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::GuardCondition;

    #[test]
    fn new_wait_set_is_empty() {
        let data = ConditionVariableData::new();
        let sut: WaitSet<'_, 4> = WaitSet::new(&data);
        assert!(sut.is_empty());
        assert_eq!(sut.size(), 0);
        assert_eq!(sut.capacity(), 4);
        assert!(ptr::eq(sut.condition_variable(), &data));
    }

    #[test]
    fn default_capacity_is_max_number_of_conditions() {
        let data = ConditionVariableData::new();
        let sut: WaitSet<'_> = WaitSet::new(&data);
        assert_eq!(sut.capacity(), MAX_NUMBER_OF_CONDITIONS);
    }

    #[test]
    fn attach_binds_condition() {
        let data = ConditionVariableData::new();
        let guard = GuardCondition::new();
        let mut sut: WaitSet<'_, 4> = WaitSet::new(&data);

        assert!(sut.attach_condition(&guard));
        assert!(sut.contains(&guard));
        assert!(guard.is_condition_variable_attached());
    }

    #[test]
    fn detach_unbinds_condition() {
        let data = ConditionVariableData::new();
        let guard = GuardCondition::new();
        let mut sut: WaitSet<'_, 4> = WaitSet::new(&data);

        sut.attach_condition(&guard);
        assert!(sut.detach_condition(&guard));
        assert!(!sut.contains(&guard));
        assert!(!guard.is_condition_variable_attached());
        assert!(!sut.detach_condition(&guard));
    }

    #[test]
    fn drop_detaches_remaining_conditions() {
        let data = ConditionVariableData::new();
        let guard = GuardCondition::new();
        {
            let mut sut: WaitSet<'_, 4> = WaitSet::new(&data);
            sut.attach_condition(&guard);
        }
        assert!(!guard.is_condition_variable_attached());
    }

    #[test]
    fn zero_timeout_skips_ready_conditions() {
        let data = ConditionVariableData::new();
        let guard = GuardCondition::new();
        let mut sut: WaitSet<'_, 4> = WaitSet::new(&data);
        sut.attach_condition(&guard);
        guard.trigger();

        assert!(sut.timed_wait(Duration::ZERO).is_empty());
    }

    #[test]
    fn wait_on_empty_set_returns_immediately() {
        let data = ConditionVariableData::new();
        let mut sut: WaitSet<'_, 4> = WaitSet::new(&data);
        assert!(sut.wait().is_empty());
    }

    #[test]
    fn stale_notification_does_not_end_timed_wait_early() {
        let data = ConditionVariableData::new();
        let guard = GuardCondition::new();
        let mut sut: WaitSet<'_, 4> = WaitSet::new(&data);
        sut.attach_condition(&guard);

        // Triggered and consumed in a previous cycle.
        guard.trigger();
        guard.reset();

        let start = Instant::now();
        assert!(sut.timed_wait(Duration::from_millis(5)).is_empty());
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
