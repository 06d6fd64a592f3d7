//! Platform-specific operations: futex blocking, segment mapping and process queries.

use memmap2::{MmapMut, MmapOptions};
use nix::unistd::getpid;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::{futex_wait, futex_wake, segment_dir};

#[cfg(not(target_os = "linux"))]
mod fallback;
#[cfg(not(target_os = "linux"))]
pub use fallback::{futex_wait, futex_wake, segment_dir};

/// Result of a single blocking call on a futex word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Returned before the timeout: woken, interrupted or the word had changed.
    Woken,
    /// The relative timeout elapsed.
    TimedOut,
}

/// Full path of the backing file of segment `name`.
pub fn segment_path(name: &str) -> PathBuf {
    segment_dir().join(format!("{}{}", tern::consts::SEGMENT_PREFIX, name))
}

/// Create a new backing file of `size` bytes and map it.
///
/// Fails with `AlreadyExists` if `path` exists.
pub fn create_segment_mmap(path: &Path, size: usize) -> std::io::Result<MmapMut> {
    let file = OpenOptions::new()
        .create_new(true)
        .read(true)
        .write(true)
        .mode(0o600)
        .open(path)?;

    file.set_len(size as u64)?;

    // SAFETY: the file was just created exclusively; concurrent modification
    // by other processes only happens through atomics in the mapped layout.
    unsafe { MmapOptions::new().populate().map_mut(&file) }
}

/// Map an existing backing file.
pub fn attach_segment_mmap(path: &Path) -> std::io::Result<MmapMut> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;

    // SAFETY: shared state inside the mapping is only accessed through atomics.
    unsafe { MmapOptions::new().map_mut(&file) }
}

/// Check if process is alive using kill(pid, 0)
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(nix::Error::ESRCH) => false,
        // Process exists but belongs to someone else.
        Err(nix::Error::EPERM) => true,
        Err(_) => false,
    }
}

/// Get current process ID
pub fn get_current_pid() -> u32 {
    getpid().as_raw() as u32
}
