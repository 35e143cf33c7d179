//! POSIX named semaphores for cross-process coordination.
//!
//! The pipeline's five synchronization primitives (`global_mutex`,
//! `free_mutex`, `ready_mutex`, `free_spaces`, `ready_items`) are all the
//! same underlying OS object — a named semaphore, reachable by every process
//! that knows its name, persisted under `/dev/shm/sem.*` until explicitly
//! unlinked. Two thin wrappers sit on top of [`NamedSemaphore`]: a counting
//! wait/post pair used directly for `free_spaces`/`ready_items`, and
//! [`NamedMutex`], a RAII guard for the three binary semaphores used purely
//! for mutual exclusion.

mod mutex;
mod semaphore;

pub use mutex::{MutexGuard, NamedMutex};
pub use semaphore::NamedSemaphore;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("semaphore '{name}' wait interrupted by signal")]
    Interrupted { name: String },

    #[error("semaphore '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("semaphore '{name}' not found")]
    NotFound { name: String },

    #[error("semaphore operation on '{name}' failed: {source}")]
    Os {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
