//! Named shared-memory segment carrying a wait set's condition variable.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────┬─────────────────────────┬──────────────────────────┐
//! │ SegmentHeader 64 │ ConditionVariableData 64│ trigger slots (AtomicBool)│
//! └──────────────────┴─────────────────────────┴──────────────────────────┘
//! ```
//!
//! The layout holds no pointers, so each process maps it wherever the kernel
//! puts it. A consumer builds a [`WaitSet`](crate::WaitSet) over
//! [`SharedSegment::condition_variable`] and attaches one [`SlotCondition`]
//! per slot; producers in other processes open the segment by name and call
//! [`SharedSegment::trigger`].
//!
//! The creator publishes the file under its final name only after the header
//! is complete (hard link of a private temporary file), so an opener never
//! observes a half-initialised segment.

use crate::condition::{Condition, ConditionLink};
use crate::condition_variable::{ConditionVariableData, Signaler};
use crate::error::{ShmError, ShmResult};
use crate::platform::{
    attach_segment_mmap, create_segment_mmap, get_current_pid, is_process_alive, segment_path,
};
use memmap2::MmapMut;
use static_assertions::{const_assert, const_assert_eq};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering, fence};
use tern::consts::{CACHE_LINE_SIZE, MAX_TRIGGER_SLOTS, SEGMENT_SIZE, TERN_SEGMENT_MAGIC};
use tracing::{debug, info, warn};

/// Segment header: 64 bytes, cache-line aligned.
#[derive(Debug, Clone, Copy)]
#[repr(C, align(64))]
pub struct SegmentHeader {
    /// Magic bytes: must be `TERN_SEGMENT_MAGIC`.
    pub magic: [u8; 8],
    /// Layout hash of `SegmentLayout`. Openers refuse mismatches.
    pub version_hash: u32,
    /// Process that created the segment.
    pub creator_pid: u32,
    /// Number of slots in use (`1..=MAX_TRIGGER_SLOTS`).
    pub slot_count: u32,
    /// Padding to fill 64 bytes total.
    pub _padding: [u8; 44],
}

const_assert_eq!(core::mem::size_of::<SegmentHeader>(), CACHE_LINE_SIZE);

impl SegmentHeader {
    /// Header for a fresh segment.
    pub const fn new(creator_pid: u32, slot_count: u32) -> Self {
        Self {
            magic: TERN_SEGMENT_MAGIC,
            version_hash: struct_version_hash::<SegmentLayout>(),
            creator_pid,
            slot_count,
            _padding: [0; 44],
        }
    }

    /// Validate the magic bytes.
    #[inline]
    pub fn is_magic_valid(&self) -> bool {
        self.magic == TERN_SEGMENT_MAGIC
    }
}

/// Complete shared layout of a segment.
#[repr(C)]
pub struct SegmentLayout {
    /// Identification and geometry.
    pub header: SegmentHeader,
    /// Condition variable shared by producers and the consumer.
    pub condition_variable: ConditionVariableData,
    /// Ready flags, one per slot.
    pub slots: [AtomicBool; MAX_TRIGGER_SLOTS],
}

const_assert!(core::mem::size_of::<SegmentLayout>() <= SEGMENT_SIZE);

/// Layout hash from size and alignment.
///
/// Does not detect field reordering within the same size/alignment; the
/// `#[repr(C)]` layouts here are fixed.
pub const fn struct_version_hash<T>() -> u32 {
    let size = core::mem::size_of::<T>() as u32;
    let align = core::mem::align_of::<T>() as u32;
    size.wrapping_mul(0x9E3779B9) ^ align.wrapping_mul(0x517CC1B7)
}

/// A mapped segment.
pub struct SharedSegment {
    name: String,
    path: PathBuf,
    mmap: MmapMut,
    owner: bool,
}

impl SharedSegment {
    /// Create segment `name` with `slot_count` untriggered slots.
    ///
    /// The returned handle owns the segment and unlinks it on drop.
    pub fn create(name: &str, slot_count: usize) -> ShmResult<Self> {
        if slot_count == 0 || slot_count > MAX_TRIGGER_SLOTS {
            return Err(ShmError::InvalidSlotCount {
                count: slot_count,
                max: MAX_TRIGGER_SLOTS,
            });
        }

        let creator_pid = get_current_pid();
        let path = segment_path(name);
        let mut staging = path.clone().into_os_string();
        staging.push(format!(".{creator_pid}.tmp"));
        let staging = PathBuf::from(staging);

        let mut mmap =
            create_segment_mmap(&staging, SEGMENT_SIZE).map_err(|e| ShmError::from_io(name, e))?;

        // SAFETY: the mapping is page aligned, SEGMENT_SIZE bytes long and
        // zero-filled; zero is a valid SegmentLayout apart from the header,
        // which is written here before anyone else can open the file.
        unsafe {
            let layout = mmap.as_mut_ptr().cast::<SegmentLayout>();
            std::ptr::addr_of_mut!((*layout).header)
                .write(SegmentHeader::new(creator_pid, slot_count as u32));
        }
        fence(Ordering::Release);

        let published = std::fs::hard_link(&staging, &path);
        let _ = std::fs::remove_file(&staging);
        published.map_err(|e| ShmError::from_io(name, e))?;

        info!(segment = name, slots = slot_count, "segment created");
        Ok(Self {
            name: name.to_string(),
            path,
            mmap,
            owner: true,
        })
    }

    /// Map an existing segment created by this or another process.
    pub fn open(name: &str) -> ShmResult<Self> {
        let path = segment_path(name);
        let mmap = attach_segment_mmap(&path).map_err(|e| ShmError::from_io(name, e))?;

        let invalid = |reason| ShmError::InvalidLayout {
            name: name.to_string(),
            reason,
        };
        if mmap.len() < core::mem::size_of::<SegmentLayout>() {
            return Err(invalid("file too small"));
        }
        fence(Ordering::Acquire);

        // SAFETY: the mapping is page aligned and large enough for a header.
        let header = unsafe { &*mmap.as_ptr().cast::<SegmentHeader>() };
        if !header.is_magic_valid() {
            return Err(invalid("bad magic"));
        }
        if header.version_hash != struct_version_hash::<SegmentLayout>() {
            return Err(invalid("layout version mismatch"));
        }
        if header.slot_count == 0 || header.slot_count as usize > MAX_TRIGGER_SLOTS {
            return Err(invalid("slot count out of range"));
        }

        debug!(segment = name, creator = header.creator_pid, "segment opened");
        Ok(Self {
            name: name.to_string(),
            path,
            mmap,
            owner: false,
        })
    }

    fn layout(&self) -> &SegmentLayout {
        // SAFETY: validated (or initialised) in `open`/`create`; all shared
        // mutable state in the layout is atomic.
        unsafe { &*self.mmap.as_ptr().cast::<SegmentLayout>() }
    }

    /// Segment name (without prefix).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle created the segment (and unlinks it on drop).
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// The shared condition variable.
    pub fn condition_variable(&self) -> &ConditionVariableData {
        &self.layout().condition_variable
    }

    /// Number of trigger slots.
    pub fn slot_count(&self) -> usize {
        self.layout().header.slot_count as usize
    }

    /// Process that created the segment.
    pub fn creator_pid(&self) -> u32 {
        self.layout().header.creator_pid
    }

    /// Whether the creating process is still running.
    pub fn is_creator_alive(&self) -> bool {
        is_process_alive(self.creator_pid())
    }

    fn slot(&self, slot: usize) -> ShmResult<&AtomicBool> {
        let slot_count = self.slot_count();
        if slot >= slot_count {
            return Err(ShmError::SlotOutOfRange { slot, slot_count });
        }
        Ok(&self.layout().slots[slot])
    }

    /// Mark `slot` ready and wake the consumer.
    pub fn trigger(&self, slot: usize) -> ShmResult<()> {
        self.slot(slot)?.store(true, Ordering::Release);
        Signaler::new(self.condition_variable()).notify_one();
        Ok(())
    }

    /// Current ready state of `slot`.
    pub fn is_triggered(&self, slot: usize) -> ShmResult<bool> {
        Ok(self.slot(slot)?.load(Ordering::Acquire))
    }

    /// Indices of all ready slots.
    pub fn triggered_slots(&self) -> impl Iterator<Item = usize> + '_ {
        let slots = &self.layout().slots[..self.slot_count()];
        slots
            .iter()
            .enumerate()
            .filter(|(_, flag)| flag.load(Ordering::Acquire))
            .map(|(index, _)| index)
    }

    /// Condition backed by `slot`, for attaching to a wait set.
    pub fn slot_condition(&self, slot: usize) -> ShmResult<SlotCondition<'_>> {
        Ok(SlotCondition {
            slot,
            flag: self.slot(slot)?,
            link: ConditionLink::new(),
        })
    }

    /// Remove the backing file. Existing mappings stay valid.
    pub fn unlink(&self) -> ShmResult<()> {
        std::fs::remove_file(&self.path).map_err(|e| ShmError::from_io(&self.name, e))?;
        info!(segment = %self.name, "segment unlinked");
        Ok(())
    }
}

impl fmt::Debug for SharedSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSegment")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("owner", &self.owner)
            .field("slot_count", &self.slot_count())
            .finish()
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        if !self.owner {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(segment = %self.name, "segment removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(segment = %self.name, error = %e, "failed to remove segment"),
        }
    }
}

/// Condition whose ready flag is a segment slot.
///
/// The flag may be set by any process that maps the segment; the consumer
/// clears it with [`take`](Self::take) once the event is handled.
#[derive(Debug)]
pub struct SlotCondition<'a> {
    slot: usize,
    flag: &'a AtomicBool,
    link: ConditionLink<'a>,
}

impl SlotCondition<'_> {
    /// Slot index in the segment.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Consume the trigger. Returns whether it was set.
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }
}

impl<'a> Condition<'a> for SlotCondition<'a> {
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
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique(prefix: &str) -> String {
        format!("{prefix}_{}", std::process::id())
    }

    #[test]
    fn header_size_and_alignment() {
        assert_eq!(core::mem::size_of::<SegmentHeader>(), 64);
        assert_eq!(core::mem::align_of::<SegmentHeader>(), 64);
    }

    #[test]
    fn header_magic_validation() {
        let header = SegmentHeader::new(1, 1);
        assert!(header.is_magic_valid());

        let mut bad_header = header;
        bad_header.magic[0] = b'X';
        assert!(!bad_header.is_magic_valid());
    }

    #[test]
    fn version_hash_differs_for_different_types() {
        assert_ne!(
            struct_version_hash::<SegmentLayout>(),
            struct_version_hash::<SegmentHeader>()
        );
    }

    #[test]
    fn invalid_slot_counts_are_rejected() {
        assert!(matches!(
            SharedSegment::create(&unique("seg_zero"), 0),
            Err(ShmError::InvalidSlotCount { .. })
        ));
        assert!(matches!(
            SharedSegment::create(&unique("seg_many"), MAX_TRIGGER_SLOTS + 1),
            Err(ShmError::InvalidSlotCount { .. })
        ));
    }

    #[test]
    fn slot_access_is_bounds_checked() {
        let segment = SharedSegment::create(&unique("seg_bounds"), 2).unwrap();
        assert!(segment.trigger(1).is_ok());
        assert!(matches!(
            segment.trigger(2),
            Err(ShmError::SlotOutOfRange { slot: 2, slot_count: 2 })
        ));
        assert!(segment.slot_condition(5).is_err());
    }

    #[test]
    fn slot_condition_take_consumes_trigger() {
        let segment = SharedSegment::create(&unique("seg_take"), 1).unwrap();
        let condition = segment.slot_condition(0).unwrap();
        assert!(!condition.has_trigger());

        segment.trigger(0).unwrap();
        assert!(condition.has_trigger());
        assert!(condition.take());
        assert!(!condition.has_trigger());
        assert!(!condition.take());
    }
}
