use crate::slot::{MAX_PEERS, ProcessStats};
use std::sync::atomic::AtomicU8;

/// Identifies a mapped file as a valid xorpipe segment. ASCII "XORPIPE1".
pub const SEGMENT_MAGIC: u64 = 0x584F_5250_4950_4531;

/// Bumped whenever the header layout changes incompatibly.
pub const SEGMENT_VERSION: u64 = 1;

const INPUT_NAME_CAP: usize = 256;

/// Head/tail/size bookkeeping for one of the two embedded rings. Stored by
/// value inside [`Header`] so both the free ring and the ready ring live in
/// the fixed-size header rather than requiring a separate allocation.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct RingDescriptor {
    pub head: u64,
    pub tail: u64,
    pub size: u64,
    pub capacity: u64,
    /// Byte offset from the segment base to this ring's `[RingCell; capacity]`
    /// array.
    pub array_offset: u64,
}

impl RingDescriptor {
    pub const EMPTY: RingDescriptor = RingDescriptor {
        head: 0,
        tail: 0,
        size: 0,
        capacity: 0,
        array_offset: 0,
    };
}

/// Fixed header at offset 0 of every shared segment.
///
/// All fields are read and written under `global_mutex` except
/// `shutdown_flag`, which is an atomic so every role can cheaply poll it at
/// suspension points without taking the mutex (see §5's cooperative-flag
/// design note); the authoritative state transition (0 -> 1) still happens
/// with `global_mutex` held, so a reader that wants a consistent snapshot
/// alongside other header fields still takes the mutex.
#[repr(C)]
pub struct Header {
    pub magic: u64,
    pub version: u64,

    pub capacity: u64,
    pub file_size: u64,
    pub xor_key: u8,
    _pad0: [u8; 7],

    pub shutdown_flag: AtomicU8,
    _pad1: [u8; 7],

    pub next_source_index: u64,
    pub processed_count: u64,

    pub active_emitters: i64,
    pub active_receivers: i64,
    pub total_emitters: u64,
    pub total_receivers: u64,

    pub slot_region_offset: u64,
    pub input_region_offset: u64,

    pub free_ring: RingDescriptor,
    pub ready_ring: RingDescriptor,

    pub emitter_pids: [i32; MAX_PEERS],
    pub receiver_pids: [i32; MAX_PEERS],

    pub emitter_stats: [ProcessStats; MAX_PEERS],
    pub receiver_stats: [ProcessStats; MAX_PEERS],
    pub emitter_stats_count: u64,
    pub receiver_stats_count: u64,

    input_name: [u8; INPUT_NAME_CAP],
    input_name_len: u64,
}

impl Header {
    /// Validates that a mapped region actually holds a header this binary
    /// understands, and that its declared dimensions are sane.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.magic != SEGMENT_MAGIC {
            return Err("bad segment magic");
        }
        if self.version != SEGMENT_VERSION {
            return Err("unsupported segment version");
        }
        if self.capacity == 0 {
            return Err("capacity must be nonzero");
        }
        if self.file_size == 0 {
            return Err("file_size must be nonzero");
        }
        Ok(())
    }

    pub fn set_input_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let len = bytes.len().min(INPUT_NAME_CAP);
        self.input_name[..len].copy_from_slice(&bytes[..len]);
        if len < INPUT_NAME_CAP {
            self.input_name[len..].fill(0);
        }
        self.input_name_len = len as u64;
    }

    pub fn input_name(&self) -> &str {
        let len = (self.input_name_len as usize).min(INPUT_NAME_CAP);
        std::str::from_utf8(&self.input_name[..len]).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_name_roundtrips() {
        let mut buf = [0u8; std::mem::size_of::<Header>()];
        // SAFETY: the buffer is large enough and zeroed, which is a valid
        // bit pattern for every field in Header (atomics included).
        let header = unsafe { &mut *(buf.as_mut_ptr() as *mut Header) };
        header.set_input_name("payload.bin");
        assert_eq!(header.input_name(), "payload.bin");
    }

    #[test]
    fn input_name_truncates_to_capacity() {
        let mut buf = [0u8; std::mem::size_of::<Header>()];
        let header = unsafe { &mut *(buf.as_mut_ptr() as *mut Header) };
        let long = "x".repeat(INPUT_NAME_CAP + 50);
        header.set_input_name(&long);
        assert_eq!(header.input_name().len(), INPUT_NAME_CAP);
    }

    #[test]
    fn validate_rejects_wrong_magic() {
        let mut buf = [0u8; std::mem::size_of::<Header>()];
        let header = unsafe { &mut *(buf.as_mut_ptr() as *mut Header) };
        header.magic = 0xdead_beef;
        assert!(header.validate().is_err());
    }
}
