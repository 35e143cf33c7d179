use std::io;

/// Kind of peer a registration-table operation concerns, used only to make
/// [`ShmError::RegistrationFull`] actionable in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerKind {
    Emitter,
    Receiver,
}

impl std::fmt::Display for PeerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerKind::Emitter => write!(f, "emitter"),
            PeerKind::Receiver => write!(f, "receiver"),
        }
    }
}

/// Errors from creating, attaching to, or operating on a shared segment.
///
/// Everything here is a `StartupFailure` except [`ShmError::RegistrationFull`]
/// (a newly-joining process rejects and exits, but the segment itself is
/// healthy) — see the error taxonomy for the full policy table.
#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    #[error("requested segment size exceeds the platform maximum")]
    SegmentTooLarge,

    #[error("a segment already exists at '{path}'")]
    AlreadyExists { path: String },

    #[error("no segment found at '{path}'")]
    NotFound { path: String },

    #[error("segment at '{path}' failed validation: {reason}")]
    InvalidHeader { path: String, reason: &'static str },

    #[error("capacity must be at least 1")]
    CapacityZero,

    #[error("input file is empty")]
    FileSizeZero,

    #[error("{kind} registration table is full (limit {limit})")]
    RegistrationFull { kind: PeerKind, limit: usize },

    #[error(transparent)]
    Sync(#[from] xorpipe_sync::SyncError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
