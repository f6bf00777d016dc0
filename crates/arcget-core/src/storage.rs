//! Temp artifact writer for in-flight downloads.
//!
//! Every transfer streams into `<target>.part`; the final path only ever
//! appears via `finalize`, an atomic rename performed after verification.

use std::fs::{self, File};
use std::io;
#[cfg(unix)]
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// Suffix appended to the final filename while a transfer is in flight.
pub const PART_SUFFIX: &str = ".part";

/// Path of the temp artifact for a given final path.
pub fn part_path(target: &Path) -> PathBuf {
    let mut os = target.as_os_str().to_os_string();
    os.push(PART_SUFFIX);
    PathBuf::from(os)
}

/// Writer for the `.part` temp artifact of one download.
///
/// Bytes are written pwrite-style at explicit offsets, so the resume offset
/// is always the artifact's size and never a cursor position.
pub struct PartWriter {
    file: File,
    temp_path: PathBuf,
}

impl PartWriter {
    /// Create or truncate the temp artifact for a fresh download.
    pub fn open_fresh(temp_path: &Path) -> io::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)?;
        Ok(Self {
            file,
            temp_path: temp_path.to_path_buf(),
        })
    }

    /// Open an existing temp artifact for resume. Returns the writer and the
    /// artifact's current size, which is the offset the next byte belongs at.
    pub fn open_resume(temp_path: &Path) -> io::Result<(Self, u64)> {
        let file = File::options().read(true).write(true).open(temp_path)?;
        let len = file.metadata()?.len();
        Ok((
            Self {
                file,
                temp_path: temp_path.to_path_buf(),
            },
            len,
        ))
    }

    /// Write `data` at `offset` without moving a shared cursor.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    /// Non-Unix fallback: seek + write on a cloned handle.
    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = self.file.try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)
    }

    /// Drop all bytes written so far. Used when the server ignores a range
    /// request and sends the full body from offset 0.
    pub fn truncate(&self) -> io::Result<()> {
        self.file.set_len(0)
    }

    /// Sync artifact data to disk. Call before `finalize` for durability.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    /// Path of the temp artifact.
    pub fn path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically rename the verified artifact onto the final path. Consumes
    /// the writer and closes the file.
    pub fn finalize(self, final_path: &Path) -> io::Result<()> {
        let PartWriter { file, temp_path } = self;
        drop(file);
        fs::rename(&temp_path, final_path)
    }

    /// Remove the artifact (verification failed). Consumes the writer.
    pub fn discard(self) -> io::Result<()> {
        let PartWriter { file, temp_path } = self;
        drop(file);
        fs::remove_file(&temp_path)
    }
}
