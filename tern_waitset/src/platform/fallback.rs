//! Polling stand-in for futexes on Unix targets without them.

use super::BlockOutcome;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Re-check interval of the polling wait.
const POLL_INTERVAL: Duration = Duration::from_micros(200);

/// Sleep for one poll interval (or `timeout`, if shorter) unless the word changed.
pub fn futex_wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> BlockOutcome {
    if word.load(Ordering::Acquire) != expected {
        return BlockOutcome::Woken;
    }
    match timeout {
        Some(timeout) if timeout <= POLL_INTERVAL => {
            std::thread::sleep(timeout);
            if word.load(Ordering::Acquire) != expected {
                BlockOutcome::Woken
            } else {
                BlockOutcome::TimedOut
            }
        }
        _ => {
            std::thread::sleep(POLL_INTERVAL);
            BlockOutcome::Woken
        }
    }
}

/// Pollers observe the new value on their own; nothing to wake.
pub fn futex_wake(_word: &AtomicU32, _count: u32) -> usize {
    0
}

/// Directory holding segment backing files.
pub fn segment_dir() -> PathBuf {
    std::env::temp_dir()
}
