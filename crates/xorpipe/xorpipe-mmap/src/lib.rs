//! File-backed memory mapping for cross-process shared memory.
//!
//! A shared segment in this workspace is not System V `shmget` memory: it is
//! an ordinary file, opened by every participating process and mapped with
//! `memmap2`. This keeps the "shared memory" concept portable and lets the
//! terminator reclaim it with a plain `remove_file` instead of an `ipcrm`
//! call. Every consumer of the mapped bytes must address them as
//! `base + offset`, never as a pointer captured by another process: the
//! mapping lives at a different virtual address in every process.

use memmap2::{Mmap, MmapMut};
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
};

#[derive(Debug)]
pub struct MmapFileMut {
    /// File handle kept alive to maintain the memory map validity
    _file: File,
    /// Memory-mapped region providing mutable access to file contents
    mmap: MmapMut,
}

pub struct MmapFile {
    /// File handle kept alive to maintain the memory map validity
    _file: File,
    /// Memory-mapped region providing read-only access to file contents
    mmap: Mmap,
}

impl MmapFileMut {
    /// Create a new file sized to `size_bytes` and map it read-write.
    ///
    /// Fails with `ErrorKind::AlreadyExists` if the path is already present,
    /// so the caller can distinguish "I created this segment" from
    /// "a previous run's segment is still on disk".
    pub fn create_rw_exclusive<P: AsRef<Path>>(path: P, size_bytes: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(path)?;
        file.set_len(size_bytes)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Open an existing file and map it to read and write
    pub fn open_rw<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self { _file: file, mmap })
    }

    /// Return raw pointer to start of memory mapped file data
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

impl MmapFile {
    /// Open an existing file and map it read-only.
    pub fn open_ro<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { _file: file, mmap })
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

/// Removes the backing file for a shared segment. Idempotent: a missing file
/// is not an error, since the terminator may race a crashed peer's cleanup.
pub fn remove_backing_file<P: AsRef<Path>>(path: P) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_path(tag: &str) -> String {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("/tmp/xorpipe_mmap_test_{tag}_{ts}_{}", std::process::id())
    }

    #[test]
    fn mmap_roundtrip_bytes() {
        let path = unique_path("roundtrip");
        let size = 4096;

        {
            let mut mm = MmapFileMut::create_rw_exclusive(&path, size).unwrap();
            unsafe {
                let p = mm.as_mut_ptr();
                *p.add(0) = 0xAB;
                *p.add(1) = 0xCD;
            }
        }
        {
            let mm = MmapFile::open_ro(&path).unwrap();
            unsafe {
                let p = mm.as_ptr();
                assert_eq!(*p.add(0), 0xAB);
                assert_eq!(*p.add(1), 0xCD);
            }
        }

        remove_backing_file(&path).unwrap();
    }

    #[test]
    fn create_rw_exclusive_rejects_existing_path() {
        let path = unique_path("exclusive");
        let _first = MmapFileMut::create_rw_exclusive(&path, 64).unwrap();
        let second = MmapFileMut::create_rw_exclusive(&path, 64);
        assert_eq!(second.unwrap_err().kind(), io::ErrorKind::AlreadyExists);
        remove_backing_file(&path).unwrap();
    }

    #[test]
    fn remove_backing_file_is_idempotent() {
        let path = unique_path("missing");
        assert!(remove_backing_file(&path).is_ok());
    }
}
