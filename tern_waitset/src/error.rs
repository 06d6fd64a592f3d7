//! Error types for shared segment operations
//!
//! Wait set bookkeeping never fails with an error: attach, detach and the
//! wait calls report their outcome directly. Only acquiring or addressing
//! shared-memory resources is fallible.

use thiserror::Error;

/// Errors that can occur during shared segment operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// Segment already exists
    #[error("Segment already exists: {name}")]
    AlreadyExists {
        /// Segment name
        name: String,
    },

    /// Segment not found
    #[error("Segment not found: {name}")]
    NotFound {
        /// Segment name
        name: String,
    },

    /// Permission denied
    #[error("Permission denied accessing segment: {name}")]
    PermissionDenied {
        /// Segment name
        name: String,
    },

    /// Mapped file is not a compatible tern segment
    #[error("Invalid segment layout in {name}: {reason}")]
    InvalidLayout {
        /// Segment name
        name: String,
        /// What failed validation
        reason: &'static str,
    },

    /// Slot index outside the segment's slot range
    #[error("Slot {slot} out of range (segment has {slot_count} slots)")]
    SlotOutOfRange {
        /// Requested slot
        slot: usize,
        /// Slots carried by the segment
        slot_count: usize,
    },

    /// Requested slot count cannot be represented in a segment
    #[error("Invalid slot count: {count} (must be 1..={max})")]
    InvalidSlotCount {
        /// Requested count
        count: usize,
        /// Upper bound
        max: usize,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },
}

impl ShmError {
    /// Classify an IO error raised while accessing segment `name`.
    pub(crate) fn from_io(name: &str, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound {
                name: name.to_string(),
            },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists {
                name: name.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                name: name.to_string(),
            },
            _ => Self::Io { source },
        }
    }
}

/// Result type for shared segment operations
pub type ShmResult<T> = Result<T, ShmError>;
