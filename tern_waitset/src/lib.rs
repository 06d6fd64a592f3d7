//! # tern Wait Set
//!
//! Event multiplexing for zero-copy shared-memory IPC: a bounded,
//! allocation-free wait set that blocks one consumer thread until any of its
//! attached conditions becomes ready, woken through a condition variable that
//! lives in memory shared between processes.
//!
//! ## Features
//!
//! - **Allocation-Free**: the attached set and every wait result are
//!   fixed-capacity arrays
//! - **Cross-Process Wake-Up**: the condition variable is a pointer-free
//!   futex block usable at any mapping address
//! - **Level-Triggered**: every wake rescans all attached conditions, so
//!   coalesced or spurious wakes are harmless
//! - **Bounded Waits**: `timed_wait` never blocks past its deadline
//! - **Lock-Free Producers**: triggering is an atomic store plus a counter
//!   increment; the wake syscall only happens when a consumer sleeps
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌───────────────────────┐    ┌─────────────────┐
//! │ Producer        │    │ ConditionVariableData │    │ Consumer        │
//! │                 │    │  (shared memory)      │    │                 │
//! │ set ready flag  ├───►│ notification counter  ├───►│ WaitSet::wait   │
//! │ Signaler        │    │ futex word            │    │ Waiter + rescan │
//! └─────────────────┘    └───────────────────────┘    └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use tern_waitset::{ConditionVariableData, GuardCondition, WaitSet};
//!
//! let data = ConditionVariableData::new();
//! let shutdown = GuardCondition::new();
//! let mut wait_set: WaitSet<'_, 8> = WaitSet::new(&data);
//! assert!(wait_set.attach_condition(&shutdown));
//!
//! // Nothing ready yet.
//! assert!(wait_set.timed_wait(Duration::from_millis(1)).is_empty());
//!
//! std::thread::scope(|s| {
//!     s.spawn(|| shutdown.trigger());
//!     let ready = wait_set.wait();
//!     assert_eq!(ready.len(), 1);
//! });
//! ```
//!
//! Across processes, the condition variable lives in a [`SharedSegment`]:
//!
//! ```rust,no_run
//! use tern_waitset::{SharedSegment, ShmResult, WaitSet};
//!
//! # fn main() -> ShmResult<()> {
//! // Consumer
//! let segment = SharedSegment::create("sensors", 2)?;
//! let lidar = segment.slot_condition(0)?;
//! let mut wait_set: WaitSet<'_, 2> = WaitSet::new(segment.condition_variable());
//! wait_set.attach_condition(&lidar);
//!
//! // Producer, typically in another process
//! SharedSegment::open("sensors")?.trigger(0)?;
//!
//! for _ready in wait_set.wait() {
//!     lidar.take();
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! - **WaitSet**: one consumer; attach/detach/clear and the waits take `&mut self`
//! - **Conditions / Signaler**: callable from any thread or process
//! - **SharedSegment**: `trigger` is safe from any number of producers

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod condition;
pub mod condition_variable;
pub mod error;
pub mod platform;
pub mod segment;
pub mod wait_set;

pub use condition::{Condition, ConditionLink, GuardCondition};
pub use condition_variable::{ConditionVariableData, Signaler, WakeUp, Waiter};
pub use error::{ShmError, ShmResult};
pub use segment::{SegmentHeader, SegmentLayout, SharedSegment, SlotCondition};
pub use wait_set::{ConditionVector, WaitSet};

/// Initialize tracing for library users and tests
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
