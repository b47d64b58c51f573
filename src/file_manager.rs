//! Positional file I/O for one table's data file.
//!
//! Grounded on the teacher's `Storage` trait and `SimpleFileStorage`
//! (`src/stg.rs`): `size`/`read`/`write` over a `std::fs::File`. This
//! generalises that trait's two operations into the four positional
//! operations a slot-structured file needs, and drops the MVCC-oriented
//! `commit`/`read_multiple` signature. Since a `FileManager` is owned
//! exclusively by one `Table` (Section 5, "Shared-resource policy"),
//! exclusivity is expressed with `&mut self` rather than an internal mutex.

use crate::error::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Owns one lazily-opened file handle for a table's `.data` file.
pub struct FileManager {
    file: fs::File,
    path: PathBuf,
}

impl FileManager {
    /// Open (creating if necessary) the data file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        Ok(FileManager { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file size in bytes.
    pub fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Positional read of `length` bytes at `position`. A read strictly
    /// past EOF surfaces as `Error::NotFound`; a read that starts within
    /// the file but runs past EOF is `Error::Io`.
    pub fn read(&mut self, length: usize, position: u64) -> Result<Vec<u8>> {
        let size = self.size()?;
        if position >= size {
            return Err(Error::NotFound(format!(
                "read at {position} is past end of file (size {size})"
            )));
        }
        let mut buf = vec![0u8; length];
        self.file.seek(SeekFrom::Start(position))?;
        self.file.read_exact(&mut buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("short read at {position}, wanted {length} bytes"),
                ))
            } else {
                Error::Io(e)
            }
        })?;
        Ok(buf)
    }

    /// Positional read into a caller-supplied buffer (avoids an allocation
    /// when the caller already owns a fixed-size block, e.g. the row
    /// codec's `total_size`-sized buffer).
    pub fn read_into(&mut self, position: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(position))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Positional write; extends the file if `position` is past the
    /// current size (the gap is implicitly zero-filled by the filesystem).
    pub fn write(&mut self, bytes: &[u8], position: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(position))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    /// Batched write: the effect is equivalent to calling [`Self::write`]
    /// for each `(bytes, position)` pair in order. Implemented here as a
    /// tight serial sequence followed by one `flush`, matching the
    /// distilled spec's "a single vectored write or a tight serial
    /// sequence" allowance.
    pub fn write_multiple(&mut self, writes: &[(&[u8], u64)]) -> Result<()> {
        for (bytes, position) in writes {
            self.write(bytes, *position)?;
        }
        self.file.flush()?;
        Ok(())
    }

    /// Release the handle. Idempotent: dropping an already-closed
    /// `FileManager` is a no-op since `close` consumes `self`.
    pub fn close(self) -> Result<()> {
        Ok(())
    }
}
