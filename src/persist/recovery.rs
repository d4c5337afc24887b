//! On-disk mirror of the pending buffer.
//!
//! The file holds a single JSON array of [`LogRecord`]s, exactly the records
//! that have been accepted but not yet confirmed durable. It is replaced
//! wholesale on every write using write-to-temp-then-rename:
//! 1. Write to `<name>.tmp` next to the target
//! 2. fsync the temp file
//! 3. Rename over the target
//! 4. fsync the parent directory
//!
//! A crash therefore leaves either the previous array or the new one on disk.
//! A failed write removes the temp file.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::record::LogRecord;

/// Failure reading or writing the recovery file.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryFileError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Contents are not a JSON array of records.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Location of the recovery file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryFile {
    path: PathBuf,
}

impl RecoveryFile {
    /// Recovery file at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored records.
    ///
    /// The file must be a JSON array. Entries that do not decode to a valid
    /// record (blank content or server, bad timestamp) are dropped with a
    /// warning; the rest are returned in order.
    pub fn load(&self) -> Result<Vec<LogRecord>, RecoveryFileError> {
        let bytes = std::fs::read(&self.path)?;
        let entries: Vec<serde_json::Value> = serde_json::from_slice(&bytes)?;

        let mut records = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<LogRecord>(entry) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(
                        path = %self.path.display(),
                        index,
                        error = %err,
                        "Dropping invalid recovery entry"
                    );
                }
            }
        }
        Ok(records)
    }

    /// Like [`RecoveryFile::load`], but a missing file is `None`.
    pub fn try_load(&self) -> Result<Option<Vec<LogRecord>>, RecoveryFileError> {
        match self.load() {
            Ok(records) => Ok(Some(records)),
            Err(RecoveryFileError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Atomically replaces the file with `records`.
    pub fn write(&self, records: &[LogRecord]) -> Result<(), RecoveryFileError> {
        let parent = parent_dir(&self.path);
        std::fs::create_dir_all(parent)?;

        let tmp_path = self.tmp_path()?;
        let bytes = serde_json::to_vec(records)?;
        if let Err(err) = write_then_rename(&tmp_path, &self.path, &bytes) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(err.into());
        }

        fsync_dir(parent)?;
        Ok(())
    }

    fn tmp_path(&self) -> io::Result<PathBuf> {
        let name = self.path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("recovery path {} has no file name", self.path.display()),
            )
        })?;
        let mut tmp = OsString::from(name);
        tmp.push(".tmp");
        Ok(self.path.with_file_name(tmp))
    }
}

fn write_then_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(tmp_path, path)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

// Makes the rename itself durable.
fn fsync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
