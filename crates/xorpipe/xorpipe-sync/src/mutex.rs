use crate::{NamedSemaphore, SyncError};

/// A named binary semaphore used purely for mutual exclusion
/// (`global_mutex`, `free_mutex`, `ready_mutex`).
pub struct NamedMutex {
    sem: NamedSemaphore,
}

impl NamedMutex {
    pub fn create(name: &str) -> Result<Self, SyncError> {
        Ok(Self {
            sem: NamedSemaphore::create(name, 1)?,
        })
    }

    pub fn open_existing(name: &str) -> Result<Self, SyncError> {
        Ok(Self {
            sem: NamedSemaphore::open_existing(name)?,
        })
    }

    /// Acquires the mutex, blocking until it is free. Signal interruptions
    /// are retried transparently: a mutex's critical section must run to
    /// completion once entered, so there is no useful place to surface a
    /// shutdown check mid-acquisition.
    pub fn lock(&self) -> Result<MutexGuard<'_>, SyncError> {
        self.sem.wait_retrying()?;
        Ok(MutexGuard { sem: &self.sem })
    }

    pub fn name(&self) -> &str {
        self.sem.name()
    }
}

/// Releases the mutex when dropped, including on an early return or panic
/// unwind out of the critical section.
pub struct MutexGuard<'a> {
    sem: &'a NamedSemaphore,
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.sem.post() {
            tracing::error!(semaphore = self.sem.name(), error = %e, "failed to release mutex");
        }
    }
}
