//! Sparse PID registration tables and the append-only stats rows, both
//! fields of [`Header`][xorpipe_slots::Header]. Every function here assumes
//! the caller already holds `global_mutex`.

use crate::error::{PeerKind, ShmError};
use xorpipe_slots::{Header, MAX_PEERS, ProcessStats};

/// Finds the first empty slot (`pid == 0`) in `pids` and claims it.
/// Fails with [`ShmError::RegistrationFull`] once all [`MAX_PEERS`] entries
/// are taken, matching the "later joiners fail StartupFailure" rule.
pub fn register(pids: &mut [i32; MAX_PEERS], pid: i32, kind: PeerKind) -> Result<(), ShmError> {
    for slot in pids.iter_mut() {
        if *slot == 0 {
            *slot = pid;
            return Ok(());
        }
    }
    Err(ShmError::RegistrationFull { kind, limit: MAX_PEERS })
}

/// Clears a PID's entry on exit. A PID not found is not an error: a process
/// that failed registration never occupied a slot to begin with.
pub fn unregister(pids: &mut [i32; MAX_PEERS], pid: i32) {
    for slot in pids.iter_mut() {
        if *slot == pid {
            *slot = 0;
            return;
        }
    }
}

/// Appends a stats row, capped at [`MAX_PEERS`] entries (older rows are
/// never evicted; once full, later exits are silently uncounted in the
/// per-pid table, though the aggregate counters in the header remain
/// accurate).
pub fn push_emitter_stats(header: &mut Header, stats: ProcessStats) {
    let i = header.emitter_stats_count as usize;
    if i < MAX_PEERS {
        header.emitter_stats[i] = stats;
        header.emitter_stats_count += 1;
    }
}

pub fn push_receiver_stats(header: &mut Header, stats: ProcessStats) {
    let i = header.receiver_stats_count as usize;
    if i < MAX_PEERS {
        header.receiver_stats[i] = stats;
        header.receiver_stats_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_claims_first_empty_slot() {
        let mut pids = [0i32; MAX_PEERS];
        pids[0] = 111;
        register(&mut pids, 222, PeerKind::Emitter).unwrap();
        assert_eq!(pids[1], 222);
    }

    #[test]
    fn register_fails_once_table_is_full() {
        let mut pids = [1i32; MAX_PEERS];
        let err = register(&mut pids, 999, PeerKind::Receiver).unwrap_err();
        assert!(matches!(err, ShmError::RegistrationFull { kind: PeerKind::Receiver, .. }));
    }

    #[test]
    fn unregister_clears_matching_entry_only() {
        let mut pids = [0i32; MAX_PEERS];
        pids[0] = 5;
        pids[1] = 7;
        unregister(&mut pids, 5);
        assert_eq!(pids[0], 0);
        assert_eq!(pids[1], 7);
    }

    #[test]
    fn stats_rows_stop_growing_past_capacity() {
        let mut buf = [0u8; std::mem::size_of::<Header>()];
        let header = unsafe { &mut *(buf.as_mut_ptr() as *mut Header) };
        for i in 0..(MAX_PEERS + 5) {
            push_emitter_stats(header, ProcessStats { pid: i as i32, ..ProcessStats::EMPTY });
        }
        assert_eq!(header.emitter_stats_count as usize, MAX_PEERS);
    }
}
