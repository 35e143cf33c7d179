//! The emitter step: claim a slot, claim a source index, transform one
//! byte, publish it. See the synchronization protocol for the six-step
//! sequence this function implements in order.

use crate::cipher::ByteCipher;
use crate::error::ShmError;
use crate::ring::{self, RingError};
use crate::segment::SharedSegment;
use crate::sync_set::SyncSet;
use std::sync::atomic::Ordering;
use xorpipe_slots::RingCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A byte was read, transformed, and published to the ready ring.
    Wrote { source_index: u64 },
    /// `next_source_index` has reached `file_size`; nothing left to emit.
    EndOfInput,
    /// The shutdown flag was observed before any work was claimed.
    ShutdownRequested,
}

/// Performs one emitter step, looping internally past transient races and
/// signal interruptions. Returns once a byte has been published, the input
/// is exhausted, or shutdown has been requested.
pub fn emitter_step<C: ByteCipher>(
    segment: &SharedSegment,
    sync: &SyncSet,
    pid: i32,
    cipher: &C,
) -> Result<StepOutcome, ShmError> {
    loop {
        if shutdown_requested(segment) {
            return Ok(StepOutcome::ShutdownRequested);
        }

        match sync.free_spaces.wait_interruptible() {
            Ok(()) => {}
            Err(xorpipe_sync::SyncError::Interrupted { .. }) => continue,
            Err(e) => return Err(e.into()),
        }

        let claimed_cell = {
            let _guard = sync.free_mutex.lock()?;
            let (desc, cells) = segment.free_ring();
            match ring::pop(desc, cells) {
                Ok(cell) => Some(cell),
                Err(RingError::Empty) => None,
                Err(RingError::Full) => unreachable!("pop never returns Full"),
            }
        };

        let Some(claimed_cell) = claimed_cell else {
            // TransientRace: the counter said a slot was free but the ring
            // disagreed. Restore the permit and retry from the top.
            tracing::debug!(pid, "free ring empty despite free_spaces permit, retrying");
            sync.free_spaces.post()?;
            continue;
        };

        let claimed_index = {
            let _guard = sync.global_mutex.lock()?;
            let header = segment.header_mut();
            if header.next_source_index >= header.file_size {
                None
            } else {
                let i = header.next_source_index;
                header.next_source_index += 1;
                header.processed_count += 1;
                Some(i)
            }
        };

        let Some(source_index) = claimed_index else {
            let _guard = sync.free_mutex.lock()?;
            let (desc, cells) = segment.free_ring();
            ring::push(desc, cells, claimed_cell).expect("slot just vacated has room in the free ring");
            drop(_guard);
            sync.free_spaces.post()?;
            return Ok(StepOutcome::EndOfInput);
        };

        let raw_byte = segment.input_bytes()[source_index as usize];

        let slot = &mut segment.slots()[claimed_cell.slot_index as usize];
        slot.byte_value = cipher.forward(raw_byte);
        slot.source_index = source_index as i64;
        slot.is_valid = 1;
        slot.emitter_pid = pid;
        slot.timestamp = unix_timestamp();

        {
            let _guard = sync.ready_mutex.lock()?;
            let (desc, cells) = segment.ready_ring();
            ring::push(
                desc,
                cells,
                RingCell { slot_index: claimed_cell.slot_index, source_index: source_index as i64 },
            )
            .expect("ready ring always has room for a slot an emitter currently owns");
        }
        sync.ready_items.post()?;

        return Ok(StepOutcome::Wrote { source_index });
    }
}

fn shutdown_requested(segment: &SharedSegment) -> bool {
    segment.header().shutdown_flag.load(Ordering::Acquire) != 0
}

fn unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
