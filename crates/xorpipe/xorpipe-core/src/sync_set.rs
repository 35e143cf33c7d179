//! The fixed bundle of five named semaphores every role opens under the
//! same well-known names.

use xorpipe_sync::{NamedMutex, NamedSemaphore, SyncError};

pub const GLOBAL_MUTEX_NAME: &str = "/sem_global_mutex";
pub const FREE_MUTEX_NAME: &str = "/sem_encrypt_queue";
pub const READY_MUTEX_NAME: &str = "/sem_decrypt_queue";
pub const FREE_SPACES_NAME: &str = "/sem_encrypt_spaces";
pub const READY_ITEMS_NAME: &str = "/sem_decrypt_items";

/// Every synchronization primitive the pipeline needs, opened by name.
pub struct SyncSet {
    pub global_mutex: NamedMutex,
    pub free_mutex: NamedMutex,
    pub ready_mutex: NamedMutex,
    pub free_spaces: NamedSemaphore,
    pub ready_items: NamedSemaphore,
}

impl SyncSet {
    /// Creates all five semaphores at their initial values. Only the
    /// initializer calls this.
    ///
    /// A partial failure (e.g. a name left behind by a crashed prior run)
    /// unlinks whichever names this call itself created before returning the
    /// error, so a retry doesn't find stale survivors from this attempt.
    pub fn create(capacity: u32) -> Result<Self, SyncError> {
        let mut created_names: Vec<&'static str> = Vec::with_capacity(5);

        macro_rules! step {
            ($name:expr, $make:expr) => {
                match $make {
                    Ok(v) => {
                        created_names.push($name);
                        v
                    }
                    Err(e) => {
                        for name in created_names.iter().rev() {
                            let _ = NamedSemaphore::unlink(name);
                        }
                        return Err(e);
                    }
                }
            };
        }

        let global_mutex = step!(GLOBAL_MUTEX_NAME, NamedMutex::create(GLOBAL_MUTEX_NAME));
        let free_mutex = step!(FREE_MUTEX_NAME, NamedMutex::create(FREE_MUTEX_NAME));
        let ready_mutex = step!(READY_MUTEX_NAME, NamedMutex::create(READY_MUTEX_NAME));
        let free_spaces = step!(FREE_SPACES_NAME, NamedSemaphore::create(FREE_SPACES_NAME, capacity));
        let ready_items = step!(READY_ITEMS_NAME, NamedSemaphore::create(READY_ITEMS_NAME, 0));

        Ok(Self { global_mutex, free_mutex, ready_mutex, free_spaces, ready_items })
    }

    /// Opens all five semaphores previously created by the initializer.
    pub fn open_existing() -> Result<Self, SyncError> {
        Ok(Self {
            global_mutex: NamedMutex::open_existing(GLOBAL_MUTEX_NAME)?,
            free_mutex: NamedMutex::open_existing(FREE_MUTEX_NAME)?,
            ready_mutex: NamedMutex::open_existing(READY_MUTEX_NAME)?,
            free_spaces: NamedSemaphore::open_existing(FREE_SPACES_NAME)?,
            ready_items: NamedSemaphore::open_existing(READY_ITEMS_NAME)?,
        })
    }

    /// Unlinks every name so no further `open_existing` can attach. Only
    /// the terminator calls this, and only after every peer has exited.
    pub fn unlink_all() -> Result<(), SyncError> {
        NamedSemaphore::unlink(GLOBAL_MUTEX_NAME)?;
        NamedSemaphore::unlink(FREE_MUTEX_NAME)?;
        NamedSemaphore::unlink(READY_MUTEX_NAME)?;
        NamedSemaphore::unlink(FREE_SPACES_NAME)?;
        NamedSemaphore::unlink(READY_ITEMS_NAME)?;
        Ok(())
    }
}
