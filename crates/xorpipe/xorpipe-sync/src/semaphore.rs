use crate::SyncError;
use std::ffi::CString;
use std::io;

/// A POSIX named semaphore (`sem_open`/`sem_wait`/`sem_post`/`sem_close`).
///
/// Each process that wants to participate opens the semaphore by name; the
/// kernel keeps exactly one counter per name regardless of how many
/// processes have it open. Only the initializer creates (`create`); every
/// other role attaches (`open_existing`). Only the terminator unlinks.
pub struct NamedSemaphore {
    handle: *mut libc::sem_t,
    name: String,
}

// SAFETY: sem_t is documented by POSIX to be safe for concurrent use by
// multiple threads/processes via sem_wait/sem_post; the pointer itself is
// never mutated after construction.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Creates a new named semaphore, failing if one with this name already
    /// exists (`O_CREAT | O_EXCL`).
    pub fn create(name: &str, initial_value: u32) -> Result<Self, SyncError> {
        let cname = cstring(name)?;
        let handle = unsafe {
            libc::sem_open(
                cname.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o666u32,
                initial_value,
            )
        };
        if handle == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            return Err(classify(name, err));
        }
        Ok(Self {
            handle,
            name: name.to_string(),
        })
    }

    /// Opens a semaphore previously created by [`NamedSemaphore::create`].
    pub fn open_existing(name: &str) -> Result<Self, SyncError> {
        let cname = cstring(name)?;
        let handle = unsafe { libc::sem_open(cname.as_ptr(), 0) };
        if handle == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            return Err(classify(name, err));
        }
        Ok(Self {
            handle,
            name: name.to_string(),
        })
    }

    /// Blocks until the semaphore can be decremented, or returns
    /// [`SyncError::Interrupted`] if a signal arrived first. Callers on a
    /// potentially long wait (`free_spaces`, `ready_items`) must handle the
    /// interrupted case by re-checking the shutdown flag before retrying.
    pub fn wait_interruptible(&self) -> Result<(), SyncError> {
        let rc = unsafe { libc::sem_wait(self.handle) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Err(SyncError::Interrupted {
                name: self.name.clone(),
            });
        }
        Err(SyncError::Os {
            name: self.name.clone(),
            source: err,
        })
    }

    /// Blocks until the semaphore can be decremented, transparently retrying
    /// on signal interruption. Used for the three mutex semaphores, whose
    /// critical sections are short enough that the shutdown flag does not
    /// need to be observed mid-acquisition.
    pub fn wait_retrying(&self) -> Result<(), SyncError> {
        loop {
            match self.wait_interruptible() {
                Ok(()) => return Ok(()),
                Err(SyncError::Interrupted { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Increments the semaphore, waking one waiter if any is blocked.
    pub fn post(&self) -> Result<(), SyncError> {
        let rc = unsafe { libc::sem_post(self.handle) };
        if rc == 0 {
            return Ok(());
        }
        Err(SyncError::Os {
            name: self.name.clone(),
            source: io::Error::last_os_error(),
        })
    }

    /// Current semaphore value. Intended for tests and diagnostics only —
    /// the value can change between the syscall returning and the caller
    /// observing it, so it must never gate correctness decisions.
    pub fn value(&self) -> Result<i32, SyncError> {
        let mut v: i32 = 0;
        let rc = unsafe { libc::sem_getvalue(self.handle, &mut v) };
        if rc == 0 {
            return Ok(v);
        }
        Err(SyncError::Os {
            name: self.name.clone(),
            source: io::Error::last_os_error(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Removes the name from the system, so no further `open_existing` can
    /// attach to it. Existing handles (including `self`) remain valid until
    /// closed. Idempotent: unlinking a name that is already gone is not an
    /// error.
    pub fn unlink(name: &str) -> Result<(), SyncError> {
        let cname = cstring(name)?;
        let rc = unsafe { libc::sem_unlink(cname.as_ptr()) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::NotFound {
            return Ok(());
        }
        Err(SyncError::Os {
            name: name.to_string(),
            source: err,
        })
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        if !self.handle.is_null() && self.handle != libc::SEM_FAILED {
            unsafe {
                libc::sem_close(self.handle);
            }
        }
    }
}

fn cstring(name: &str) -> Result<CString, SyncError> {
    CString::new(name).map_err(|_| SyncError::Os {
        name: name.to_string(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "semaphore name contains NUL"),
    })
}

fn classify(name: &str, err: io::Error) -> SyncError {
    match err.raw_os_error() {
        Some(code) if code == libc::EEXIST => SyncError::AlreadyExists {
            name: name.to_string(),
        },
        Some(code) if code == libc::ENOENT => SyncError::NotFound {
            name: name.to_string(),
        },
        _ => SyncError::Os {
            name: name.to_string(),
            source: err,
        },
    }
}
