//! Prelude module for common re-exports.
//!
//! ```rust
//! use tern_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, ServeConfig, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_TIMEOUT_MS, MAX_NUMBER_OF_CONDITIONS, MAX_TRIGGER_SLOTS};

/// Default `timed_wait` period as Duration.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(DEFAULT_TIMEOUT_MS);
