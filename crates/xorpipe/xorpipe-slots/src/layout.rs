use crate::header::Header;
use crate::slot::{RingCell, Slot};
use std::mem::size_of;

const PAGE_SIZE: usize = 4096;

/// Byte offsets and sizes of every sub-region of a segment, computed once
/// at creation time and stored (the offset fields) inside the header itself
/// so every attaching process recomputes nothing — it just trusts the
/// header's own offsets after `validate()` passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentLayout {
    pub capacity: usize,
    pub file_size: usize,
    pub header_size: usize,
    pub slot_region_offset: usize,
    pub slot_region_size: usize,
    pub input_region_offset: usize,
    pub input_region_size: usize,
    pub free_ring_offset: usize,
    pub free_ring_size: usize,
    pub ready_ring_offset: usize,
    pub ready_ring_size: usize,
    /// Page-aligned total size of the backing file / mapping.
    pub total_size: usize,
}

/// Computes the layout for a segment holding `capacity` slots and
/// `file_size` bytes of input, in the fixed order:
/// `[Header][SlotArray][InputBytes][FreeRing][ReadyRing]`.
pub fn compute_layout(capacity: usize, file_size: usize) -> SegmentLayout {
    let header_size = size_of::<Header>();
    let slot_region_offset = header_size;
    let slot_region_size = capacity * size_of::<Slot>();

    let input_region_offset = slot_region_offset + slot_region_size;
    let input_region_size = file_size;

    let free_ring_offset = input_region_offset + input_region_size;
    let free_ring_size = capacity * size_of::<RingCell>();

    let ready_ring_offset = free_ring_offset + free_ring_size;
    let ready_ring_size = capacity * size_of::<RingCell>();

    let raw_total = ready_ring_offset + ready_ring_size;
    let total_size = page_align(raw_total);

    SegmentLayout {
        capacity,
        file_size,
        header_size,
        slot_region_offset,
        slot_region_size,
        input_region_offset,
        input_region_size,
        free_ring_offset,
        free_ring_size,
        ready_ring_offset,
        ready_ring_size,
        total_size,
    }
}

fn page_align(size: usize) -> usize {
    size.div_ceil(PAGE_SIZE) * PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_regions_are_contiguous_and_ordered() {
        let l = compute_layout(16, 1000);
        assert_eq!(l.slot_region_offset, l.header_size);
        assert_eq!(l.input_region_offset, l.slot_region_offset + l.slot_region_size);
        assert_eq!(l.free_ring_offset, l.input_region_offset + l.input_region_size);
        assert_eq!(l.ready_ring_offset, l.free_ring_offset + l.free_ring_size);
        assert!(l.total_size >= l.ready_ring_offset + l.ready_ring_size);
    }

    #[test]
    fn layout_total_size_is_page_aligned() {
        let l = compute_layout(3, 7);
        assert_eq!(l.total_size % PAGE_SIZE, 0);
    }

    #[test]
    fn ring_regions_are_equal_sized() {
        let l = compute_layout(64, 4096);
        assert_eq!(l.free_ring_size, l.ready_ring_size);
        assert_eq!(l.free_ring_size, 64 * size_of::<RingCell>());
    }

    #[test]
    fn zero_capacity_is_mechanically_representable() {
        // compute_layout performs no validation itself; rejecting capacity
        // 0 is the allocator's job (`xorpipe-core`), not the layout math.
        let l = compute_layout(0, 10);
        assert_eq!(l.slot_region_size, 0);
    }
}
