//! Linux futex operations on process-shared words.
//!
//! The private flag is never used: the word may live in a shared mapping that
//! other processes see at a different virtual address. The kernel keys shared
//! futexes by backing page and offset, so waiter and waker need not agree on
//! the address.

use super::BlockOutcome;
use nix::errno::Errno;
use std::path::PathBuf;
use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Block while `*word == expected`, for at most `timeout` if given.
///
/// Returns immediately with `Woken` if the word already differs.
pub fn futex_wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> BlockOutcome {
    // SAFETY: timespec is plain old data; zero is a valid value for every field.
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    let ts_ptr = match timeout {
        Some(timeout) => {
            ts.tv_sec = timeout.as_secs().min(libc::time_t::MAX as u64) as libc::time_t;
            ts.tv_nsec = timeout.subsec_nanos() as libc::c_long;
            &ts as *const libc::timespec
        }
        None => std::ptr::null(),
    };

    // SAFETY: `word` is a valid, aligned 32-bit atomic for the duration of the
    // call and `ts_ptr` is either null or points at `ts` on this stack frame.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            libc::FUTEX_WAIT,
            expected,
            ts_ptr,
            std::ptr::null::<u32>(),
            0u32,
        )
    };

    if rc == 0 {
        return BlockOutcome::Woken;
    }
    match Errno::last() {
        Errno::ETIMEDOUT => BlockOutcome::TimedOut,
        // EAGAIN: value changed before sleeping; EINTR: signal. Caller rechecks.
        _ => BlockOutcome::Woken,
    }
}

/// Wake up to `count` threads blocked on `word`. Returns the number woken.
pub fn futex_wake(word: &AtomicU32, count: u32) -> usize {
    let count = count.min(i32::MAX as u32) as libc::c_int;

    // SAFETY: `word` is a valid, aligned 32-bit atomic for the duration of the call.
    let rc = unsafe { libc::syscall(libc::SYS_futex, word.as_ptr(), libc::FUTEX_WAKE, count) };
    if rc < 0 { 0 } else { rc as usize }
}

/// Directory holding segment backing files.
pub fn segment_dir() -> PathBuf {
    PathBuf::from(tern::consts::SHM_DIR)
}
