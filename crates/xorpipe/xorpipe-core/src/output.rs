//! The output file is a pluggable collaborator: the receiver step writes
//! through this trait, so tests can swap in an in-memory sink instead of a
//! real file.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

pub trait OutputSink {
    fn write_byte(&self, offset: u64, byte: u8) -> io::Result<()>;
}

/// A pre-sized file opened for positional writes. Multiple receivers open
/// the same path independently; distinct offsets never conflict because
/// every source index is assigned to exactly one emitter.
pub struct PositionalFile {
    file: File,
}

impl PositionalFile {
    /// Opens (creating if needed) `path` and extends it to `file_size`
    /// bytes, so every offset in `[0, file_size)` is writable up front —
    /// the receiver contract's "pre-size ... enabling sparse positional
    /// writes from multiple concurrent receivers".
    pub fn create_presized(path: &Path, file_size: u64) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.set_len(file_size)?;
        set_permissive_mode(&file);
        Ok(Self { file })
    }
}

impl OutputSink for PositionalFile {
    fn write_byte(&self, offset: u64, byte: u8) -> io::Result<()> {
        self.file.write_at(&[byte], offset)?;
        Ok(())
    }
}

#[cfg(unix)]
fn set_permissive_mode(file: &File) {
    use std::os::unix::fs::PermissionsExt;
    let _ = file.set_permissions(std::fs::Permissions::from_mode(0o666));
}

#[cfg(not(unix))]
fn set_permissive_mode(_file: &File) {}
