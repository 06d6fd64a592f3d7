//! System-wide constants for the tern workspace.
//!
//! Single source of truth for capacities, segment geometry and default paths.
//! Imported by all crates.

/// Maximum number of conditions a single wait set can hold.
///
/// Default capacity of `WaitSet`; the attached set lives in a fixed array of
/// this size and never grows.
pub const MAX_NUMBER_OF_CONDITIONS: usize = 128;

/// Maximum number of trigger slots carried by one shared segment.
pub const MAX_TRIGGER_SLOTS: usize = 64;

/// CPU cache line size in bytes.
///
/// Used for memory alignment to prevent false sharing between processes.
pub const CACHE_LINE_SIZE: usize = 64;

/// Size of a shared wait-set segment in bytes (one memory page).
pub const SEGMENT_SIZE: usize = 4096;

/// Directory backing POSIX shared memory on Linux.
pub const SHM_DIR: &str = "/dev/shm";

/// File name prefix of every tern segment.
pub const SEGMENT_PREFIX: &str = "tern_";

/// Magic bytes identifying a valid tern segment: `"TERN_WS\0"`.
pub const TERN_SEGMENT_MAGIC: [u8; 8] = *b"TERN_WS\0";

/// Default `timed_wait` period used by services, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

/// Default configuration file path for `ternctl`.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/tern/serve.toml";
