//! Command-line grammars for the four binaries, plus the two environment
//! variables every role reads. One `#[derive(Parser)]` struct per binary so
//! argument validation (hex key parsing, capacity/delay range checks) is
//! unit-testable independent of `main`.

mod args;
mod defaults;
mod error;

pub use args::{EmitterArgs, InitializerArgs, Mode, ReceiverArgs, TerminatorArgs};
pub use error::ArgsError;

use std::path::PathBuf;

/// `XORPIPE_SHM_DIR`: overrides the directory used for the backing mmap
/// file of the shared segment. Falls back to [`xorpipe_core::default_shm_dir`]
/// when unset.
pub fn shm_dir() -> PathBuf {
    std::env::var("XORPIPE_SHM_DIR").map(PathBuf::from).unwrap_or_else(|_| xorpipe_core::default_shm_dir())
}
