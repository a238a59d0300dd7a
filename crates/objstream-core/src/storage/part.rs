//! Append-only `.part` file written by a sequential download.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{marker_path, temp_path};

/// Temp file for one destination. Bytes are appended in order; `len` is the
/// offset a resumed read should continue from.
#[derive(Debug)]
pub struct PartFile {
    file: File,
    temp_path: PathBuf,
    len: u64,
}

impl PartFile {
    /// Start a fresh `.part` file for `final_path`, discarding any previous one.
    pub fn create(final_path: &Path) -> Result<Self> {
        let temp_path = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        Ok(Self {
            file,
            temp_path,
            len: 0,
        })
    }

    /// Reopen an existing `.part` file for append (creating it if missing).
    /// The returned file's `len()` is the number of bytes already on disk.
    pub fn resume(final_path: &Path) -> Result<Self> {
        let temp_path = temp_path(final_path);
        let file = File::options()
            .append(true)
            .create(true)
            .open(&temp_path)
            .with_context(|| format!("failed to open temp file for resume: {}", temp_path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("failed to stat {}", temp_path.display()))?
            .len();
        tracing::debug!(path = %temp_path.display(), len, "resuming part file");
        Ok(Self {
            file,
            temp_path,
            len,
        })
    }

    /// Bytes written so far, including any present before a resume.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Sync file data to disk. Call before `finalize` for durability.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().context("part file sync failed")?;
        Ok(())
    }

    /// Atomically rename the part file to `final_path` and drop its resume
    /// marker. Fails if `final_path` is on a different filesystem.
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        let PartFile { file, temp_path, .. } = self;
        drop(file);
        std::fs::rename(&temp_path, final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                temp_path.display(),
                final_path.display()
            )
        })?;
        let marker = marker_path(final_path);
        match std::fs::remove_file(&marker) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to remove {}", marker.display()))
            }
        }
        Ok(())
    }
}

impl Write for PartFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
