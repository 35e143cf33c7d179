//! Plain-old-data types stored inside the shared segment.
//!
//! Every type here is `#[repr(C)]` and contains no pointers: a shared
//! segment is mapped at a different virtual address in every process, so
//! any cross-region reference must be a byte offset from the segment base,
//! resolved with `base.add(offset)` by the caller. This crate only defines
//! the bytes; `xorpipe-core` is what maps a segment and walks these offsets.

mod header;
mod layout;
mod slot;

pub use header::{Header, RingDescriptor, SEGMENT_MAGIC, SEGMENT_VERSION};
pub use layout::{SegmentLayout, compute_layout};
pub use slot::{MAX_PEERS, ProcessStats, RingCell, Slot};
