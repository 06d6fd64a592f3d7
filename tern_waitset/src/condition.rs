//! Attachable ready-flag sources.
//!
//! A [`Condition`] is anything a [`WaitSet`](crate::WaitSet) can poll: it
//! carries a ready flag maintained by its event source and a back-link to the
//! condition variable of the wait set it is attached to. When the source
//! becomes ready it sets the flag first and then signals through the link.
//!
//! [`ConditionLink`] is the reusable back-link; [`GuardCondition`] is the
//! variant triggered by its owning process, typically to wake a consumer for
//! shutdown.

use crate::condition_variable::{ConditionVariableData, Signaler};
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

/// Capability of an event source that can be attached to a wait set.
///
/// `'a` bounds the condition variables the source may be bound to: the data
/// must outlive every binding made through this trait.
///
/// Implementations must be safe to poll from the consumer thread while the
/// producer mutates the ready flag concurrently.
pub trait Condition<'a>: Sync {
    /// Bind to `data`. Returns `false` if already bound to a condition variable.
    fn attach_condition_variable(&self, data: &'a ConditionVariableData) -> bool;

    /// Whether a condition variable is currently bound.
    fn is_condition_variable_attached(&self) -> bool;

    /// Unbind. Returns whether a binding existed.
    fn detach_condition_variable(&self) -> bool;

    /// Current ready state. Must not have side effects.
    fn has_trigger(&self) -> bool;
}

/// Non-owning, atomically replaceable link to a [`ConditionVariableData`].
///
/// Null while detached. Producers read it with [`signaler`](Self::signaler)
/// or [`notify`](Self::notify) from any thread.
pub struct ConditionLink<'a> {
    data: AtomicPtr<ConditionVariableData>,
    _marker: PhantomData<&'a ConditionVariableData>,
}

impl<'a> ConditionLink<'a> {
    /// Create a detached link.
    pub const fn new() -> Self {
        Self {
            data: AtomicPtr::new(ptr::null_mut()),
            _marker: PhantomData,
        }
    }

    /// Bind to `data`; fails if already bound (to this or any other data).
    pub fn attach(&self, data: &'a ConditionVariableData) -> bool {
        self.data
            .compare_exchange(
                ptr::null_mut(),
                ptr::from_ref(data).cast_mut(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Unbind. Returns whether a binding existed.
    pub fn detach(&self) -> bool {
        !self.data.swap(ptr::null_mut(), Ordering::AcqRel).is_null()
    }

    /// Whether a condition variable is bound.
    pub fn is_attached(&self) -> bool {
        !self.data.load(Ordering::Acquire).is_null()
    }

    /// The bound condition variable, if any.
    pub fn condition_variable(&self) -> Option<&'a ConditionVariableData> {
        let data = self.data.load(Ordering::Acquire);
        // SAFETY: the only non-null values ever stored come from
        // `&'a ConditionVariableData` in `attach`, so the pointee is alive
        // for `'a`. The pointer is never written through.
        unsafe { data.as_ref() }
    }

    /// A signaler for the bound condition variable, if any.
    pub fn signaler(&self) -> Option<Signaler<'a>> {
        self.condition_variable().map(Signaler::new)
    }

    /// Notify the bound condition variable. Returns `false` while detached.
    pub fn notify(&self) -> bool {
        match self.signaler() {
            Some(signaler) => {
                signaler.notify_one();
                true
            }
            None => false,
        }
    }
}

impl Default for ConditionLink<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConditionLink<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionLink")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Condition triggered directly by its owning process.
///
/// Has no external producer. Attach it to a wait set and call
/// [`trigger`](Self::trigger) from another thread to wake the consumer,
/// e.g. on shutdown.
///
/// ```rust
/// use tern_waitset::{ConditionVariableData, GuardCondition, WaitSet};
///
/// let data = ConditionVariableData::new();
/// let guard = GuardCondition::new();
/// let mut wait_set: WaitSet<'_, 4> = WaitSet::new(&data);
///
/// assert!(wait_set.attach_condition(&guard));
/// guard.trigger();
/// assert_eq!(wait_set.wait().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct GuardCondition<'a> {
    triggered: AtomicBool,
    link: ConditionLink<'a>,
}

impl<'a> GuardCondition<'a> {
    /// Create an untriggered, detached guard.
    pub const fn new() -> Self {
        Self {
            triggered: AtomicBool::new(false),
            link: ConditionLink::new(),
        }
    }

    /// Set the ready flag and wake the attached wait set.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
        self.link.notify();
    }

    /// Clear the ready flag.
    pub fn reset(&self) {
        self.triggered.store(false, Ordering::Release);
    }
}

impl<'a> Condition<'a> for GuardCondition<'a> {
    fn attach_condition_variable(&self, data: &'a ConditionVariableData) -> bool {
        self.link.attach(data)
    }

    fn is_condition_variable_attached(&self) -> bool {
        self.link.is_attached()
    }

    fn detach_condition_variable(&self) -> bool {
        self.link.detach()
    }

    fn has_trigger(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }
}
