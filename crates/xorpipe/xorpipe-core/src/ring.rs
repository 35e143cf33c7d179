//! Free-standing ring operations over a [`RingDescriptor`] plus its backing
//! `[RingCell]` array, both of which live inside the shared segment.
//!
//! These are plain functions rather than a `Ring` type wrapping its own
//! storage because the descriptor and the array live at two different
//! offsets from the segment base, and both the free ring and the ready ring
//! share this same code operating on their own descriptor/array pair. The
//! caller is always expected to be holding the matching mutex
//! (`free_mutex` for the free ring, `ready_mutex` for the ready one).

use xorpipe_slots::{RingCell, RingDescriptor};

#[derive(Debug)]
pub enum RingError {
    Full,
    Empty,
}

/// Pushes `cell` onto the tail of the ring. Fails with [`RingError::Full`]
/// when `size == capacity`.
pub fn push(desc: &mut RingDescriptor, array: &mut [RingCell], cell: RingCell) -> Result<(), RingError> {
    if desc.size >= desc.capacity {
        return Err(RingError::Full);
    }
    array[desc.tail as usize] = cell;
    desc.tail = (desc.tail + 1) % desc.capacity;
    desc.size += 1;
    Ok(())
}

/// Pops the cell at the head of the ring, FIFO order. Fails with
/// [`RingError::Empty`] when `size == 0`.
pub fn pop(desc: &mut RingDescriptor, array: &[RingCell]) -> Result<RingCell, RingError> {
    if desc.size == 0 {
        return Err(RingError::Empty);
    }
    let cell = array[desc.head as usize];
    desc.head = (desc.head + 1) % desc.capacity;
    desc.size -= 1;
    Ok(cell)
}

/// Scans the ring for the cell with the smallest `source_index`, rotates it
/// to the head, then pops it — preserving the relative order of every other
/// cell still in the ring. `O(size)`.
///
/// This mirrors the original queue manager's rotate-to-head linear scan
/// rather than a priority queue, so the ready ring needs no second
/// collection type inside the shared segment.
pub fn pop_min_source(desc: &mut RingDescriptor, array: &mut [RingCell]) -> Result<RingCell, RingError> {
    if desc.size == 0 {
        return Err(RingError::Empty);
    }

    let mut best_pos: Option<u64> = None;
    let mut best_source = i64::MAX;
    let mut pos = desc.head;
    for _ in 0..desc.size {
        if array[pos as usize].source_index < best_source {
            best_source = array[pos as usize].source_index;
            best_pos = Some(pos);
        }
        pos = (pos + 1) % desc.capacity;
    }
    let Some(best_pos) = best_pos else {
        return Err(RingError::Empty);
    };

    while desc.head != best_pos {
        let tmp = array[desc.head as usize];
        desc.head = (desc.head + 1) % desc.capacity;
        array[desc.tail as usize] = tmp;
        desc.tail = (desc.tail + 1) % desc.capacity;
        // size is unchanged: one cell left the window at head, the same
        // cell re-entered it at tail.
    }

    let cell = array[desc.head as usize];
    desc.head = (desc.head + 1) % desc.capacity;
    desc.size -= 1;
    Ok(cell)
}
