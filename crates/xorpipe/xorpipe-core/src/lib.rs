//! The cross-process coordination substrate: shared-segment layout and
//! attach, the two embedded rings, the named-semaphore protocol, the
//! emitter/receiver step functions, and the PID/stats registries they share.
//!
//! Everything this crate does not own — CLI parsing, statistics rendering,
//! directory creation for output files — is a pluggable collaborator
//! reached only through the [`cipher`] and [`output`] trait seams.

mod cipher;
mod emitter;
mod error;
mod output;
mod receiver;
mod registry;
mod ring;
mod segment;
mod sync_set;

pub use cipher::{ByteCipher, XorCipher};
pub use emitter::{StepOutcome as EmitterOutcome, emitter_step};
pub use error::{PeerKind, ShmError};
pub use output::{OutputSink, PositionalFile};
pub use receiver::{StepOutcome as ReceiverOutcome, receiver_step};
pub use registry::{push_emitter_stats, push_receiver_stats, register, unregister};
pub use ring::{RingError, pop, pop_min_source, push};
pub use segment::{SEGMENT_KEY, SharedSegment, default_shm_dir, segment_path};
pub use sync_set::{
    FREE_MUTEX_NAME, FREE_SPACES_NAME, GLOBAL_MUTEX_NAME, READY_ITEMS_NAME, READY_MUTEX_NAME, SyncSet,
};
