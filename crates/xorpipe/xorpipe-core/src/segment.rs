//! The shared segment: a memory-mapped file laid out as
//! `[Header][SlotArray][InputBytes][FreeRing][ReadyRing]`, attached
//! independently by every process in the pipeline.
//!
//! Every accessor here takes `&self`, not `&mut self`, and returns raw
//! references or slices into the mapping. This is deliberate, not sloppy:
//! the actual exclusion is enforced across *process* boundaries by the named
//! semaphores in `xorpipe-sync`, which the Rust borrow checker cannot see.
//! Callers are responsible for holding the matching mutex (documented on
//! each accessor) before touching what it returns.

use crate::error::ShmError;
use std::path::{Path, PathBuf};
use xorpipe_mmap::{MmapFileMut, remove_backing_file};
use xorpipe_slots::{Header, RingCell, RingDescriptor, SegmentLayout, Slot, compute_layout};

/// Fixed segment key every role agrees on, matching the original design's
/// single numeric shared-memory key (there is only ever one active
/// pipeline per host; see the crate's non-goals).
pub const SEGMENT_KEY: u32 = 0x1234;

/// Directory used for the backing file when the caller has no override.
/// `/dev/shm` on Linux; falls back to the system temp directory when it is
/// missing (non-Linux hosts have no tmpfs at that fixed path).
pub fn default_shm_dir() -> PathBuf {
    let dev_shm = Path::new("/dev/shm");
    if dev_shm.is_dir() {
        dev_shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

pub fn segment_path(shm_dir: &Path) -> PathBuf {
    shm_dir.join(format!("xorpipe_{SEGMENT_KEY:04x}.seg"))
}

pub struct SharedSegment {
    mm: MmapFileMut,
    layout: SegmentLayout,
    path: PathBuf,
}

impl SharedSegment {
    /// Creates a brand-new segment sized for `capacity` slots and the bytes
    /// of `input_path`, seeds the free ring full / ready ring empty, and
    /// copies the input file's bytes into the input region. Fails with
    /// [`ShmError::AlreadyExists`] if a segment is already present at this
    /// path, matching the original's "one pipeline per host" rule.
    pub fn create(shm_dir: &Path, capacity: usize, input_path: &Path, xor_key: u8) -> Result<Self, ShmError> {
        if capacity == 0 {
            return Err(ShmError::CapacityZero);
        }
        let input_bytes = std::fs::read(input_path)?;
        if input_bytes.is_empty() {
            return Err(ShmError::FileSizeZero);
        }

        let layout = compute_layout(capacity, input_bytes.len());
        if layout.total_size > platform_max_segment_size() {
            return Err(ShmError::SegmentTooLarge);
        }

        let path = segment_path(shm_dir);
        let mut mm = MmapFileMut::create_rw_exclusive(&path, layout.total_size as u64).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                ShmError::AlreadyExists { path: path.display().to_string() }
            } else {
                ShmError::Io(e)
            }
        })?;

        // SAFETY: we just created this mapping exclusively and sized it to
        // fit every sub-region computed by `layout`.
        unsafe {
            init_segment_contents(mm.as_mut_ptr(), &layout, capacity, &input_bytes, xor_key);
        }

        let input_name = input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let segment = Self { mm, layout, path };
        segment.header_mut().set_input_name(&input_name);

        tracing::info!(
            path = %segment.path.display(),
            capacity,
            file_size = input_bytes.len(),
            "created shared segment"
        );
        Ok(segment)
    }

    /// Attaches to an existing segment, validating its header.
    pub fn attach(shm_dir: &Path) -> Result<Self, ShmError> {
        let path = segment_path(shm_dir);
        let mm = MmapFileMut::open_rw(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShmError::NotFound { path: path.display().to_string() }
            } else {
                ShmError::Io(e)
            }
        })?;

        // SAFETY: the file must at least be large enough to hold a Header;
        // `validate()` below rejects it otherwise by checking magic/version
        // first (a short/garbage mapping will simply fail that check).
        let header = unsafe { &*(mm.as_ptr() as *const Header) };
        header
            .validate()
            .map_err(|reason| ShmError::InvalidHeader { path: path.display().to_string(), reason })?;

        let layout = compute_layout(header.capacity as usize, header.file_size as usize);
        tracing::debug!(path = %path.display(), "attached to shared segment");
        Ok(Self { mm, layout, path })
    }

    pub fn layout(&self) -> &SegmentLayout {
        &self.layout
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read access to the header. Always safe to call; fields mutated under
    /// `global_mutex` may be stale by the time the caller observes them
    /// unless the caller itself holds that mutex.
    pub fn header(&self) -> &Header {
        unsafe { &*(self.mm.as_ptr() as *const Header) }
    }

    /// Mutable access to the header. Caller must hold `global_mutex` before
    /// writing any field other than `shutdown_flag`, which is an atomic and
    /// safe to touch without it.
    #[allow(clippy::mut_from_ref)]
    pub fn header_mut(&self) -> &mut Header {
        unsafe { &mut *(self.mm.as_ptr() as *mut Header) }
    }

    /// The slot array. Caller must own the slot (between a free-dequeue and
    /// the matching ready-enqueue, or vice versa) before mutating an entry.
    #[allow(clippy::mut_from_ref)]
    pub fn slots(&self) -> &mut [Slot] {
        unsafe {
            let base = self.mm.as_ptr().add(self.layout.slot_region_offset) as *mut Slot;
            std::slice::from_raw_parts_mut(base, self.layout.capacity)
        }
    }

    /// The raw input bytes copied in at segment creation.
    pub fn input_bytes(&self) -> &[u8] {
        unsafe {
            let base = self.mm.as_ptr().add(self.layout.input_region_offset);
            std::slice::from_raw_parts(base, self.layout.file_size)
        }
    }

    /// The free ring's descriptor and backing cell array together, so a
    /// caller never needs to borrow the header just to reach one ring's
    /// bookkeeping. Caller must hold `free_mutex`.
    #[allow(clippy::mut_from_ref)]
    pub fn free_ring(&self) -> (&mut RingDescriptor, &mut [RingCell]) {
        let desc = unsafe { &mut (*(self.mm.as_ptr() as *mut Header)).free_ring };
        (desc, self.ring_cells(self.layout.free_ring_offset))
    }

    /// The ready ring's descriptor and backing cell array together. Caller
    /// must hold `ready_mutex`.
    #[allow(clippy::mut_from_ref)]
    pub fn ready_ring(&self) -> (&mut RingDescriptor, &mut [RingCell]) {
        let desc = unsafe { &mut (*(self.mm.as_ptr() as *mut Header)).ready_ring };
        (desc, self.ring_cells(self.layout.ready_ring_offset))
    }

    #[allow(clippy::mut_from_ref)]
    fn ring_cells(&self, offset: usize) -> &mut [RingCell] {
        unsafe {
            let base = self.mm.as_ptr().add(offset) as *mut RingCell;
            std::slice::from_raw_parts_mut(base, self.layout.capacity)
        }
    }

    /// Unmaps and removes the backing file. Only the terminator calls this,
    /// after every emitter and receiver has exited.
    pub fn destroy(self) -> std::io::Result<()> {
        let path = self.path.clone();
        drop(self);
        remove_backing_file(path)
    }
}

/// Writes the zeroed-then-populated header, slot array, input bytes and the
/// two rings into a freshly created mapping.
///
/// # Safety
/// `base` must point to a mapping at least `layout.total_size` bytes long,
/// exclusively owned by the caller (no other process has attached yet).
unsafe fn init_segment_contents(base: *mut u8, layout: &SegmentLayout, capacity: usize, input_bytes: &[u8], xor_key: u8) {
    unsafe {
        let header = &mut *(base as *mut Header);
        std::ptr::write_bytes(header as *mut Header as *mut u8, 0, layout.header_size);

        header.magic = xorpipe_slots::SEGMENT_MAGIC;
        header.version = xorpipe_slots::SEGMENT_VERSION;
        header.capacity = capacity as u64;
        header.file_size = layout.file_size as u64;
        header.xor_key = xor_key;
        header.next_source_index = 0;
        header.processed_count = 0;
        header.active_emitters = 0;
        header.active_receivers = 0;
        header.total_emitters = 0;
        header.total_receivers = 0;
        header.slot_region_offset = layout.slot_region_offset as u64;
        header.input_region_offset = layout.input_region_offset as u64;

        let slots_base = base.add(layout.slot_region_offset) as *mut Slot;
        for i in 0..capacity {
            std::ptr::write(slots_base.add(i), Slot::FREE);
        }

        let input_base = base.add(layout.input_region_offset);
        std::ptr::copy_nonoverlapping(input_bytes.as_ptr(), input_base, input_bytes.len());

        let free_base = base.add(layout.free_ring_offset) as *mut RingCell;
        for i in 0..capacity {
            std::ptr::write(free_base.add(i), RingCell { slot_index: i as i64, source_index: -1 });
        }
        header.free_ring.head = 0;
        header.free_ring.tail = 0;
        header.free_ring.size = capacity as u64;
        header.free_ring.capacity = capacity as u64;
        header.free_ring.array_offset = layout.free_ring_offset as u64;

        let ready_base = base.add(layout.ready_ring_offset) as *mut RingCell;
        for i in 0..capacity {
            std::ptr::write(ready_base.add(i), RingCell::EMPTY);
        }
        header.ready_ring.head = 0;
        header.ready_ring.tail = 0;
        header.ready_ring.size = 0;
        header.ready_ring.capacity = capacity as u64;
        header.ready_ring.array_offset = layout.ready_ring_offset as u64;
    }
}

/// Platform maximum segment size. There is no portable syscall for this;
/// we use a conservative fixed ceiling rather than querying `RLIMIT_AS`,
/// which bounds a process's whole address space, not just this mapping.
fn platform_max_segment_size() -> usize {
    16 * 1024 * 1024 * 1024
}
