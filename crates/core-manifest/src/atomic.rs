/*!
 * Crash-safe in-place replacement of a file's contents.
 *
 * New content is written to a temporary file created next to the target
 * (same directory, so same filesystem) and renamed over the target only
 * after every byte has been written. Readers observe either the old file or
 * the complete new one, never a partial write.
 *
 * The temporary file receives the target's permission bits, and on Unix its
 * owner and group, before the caller writes anything. An uncommitted
 * [`AtomicFile`] removes its temporary file when dropped, which covers both
 * error returns and panics inside the write scope.
 */

use crate::error::{Error, ReplaceStage, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// Tunables for temporary file handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOptions {
    pub temp_prefix: String,
    pub temp_suffix: String,
    /// fsync the temporary file before the rename
    pub sync: bool,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            temp_prefix: ".bagmend-".to_string(),
            temp_suffix: ".tmp".to_string(),
            sync: true,
        }
    }
}

/// A pending replacement of `target`
pub struct AtomicFile {
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
    sync: bool,
}

impl AtomicFile {
    /// Create the temporary file and copy the target's ownership and mode
    /// onto it. The target must already exist.
    pub fn begin(target: &Path, options: &ReplaceOptions) -> Result<Self> {
        let metadata =
            fs::metadata(target).map_err(|e| Error::atomic_write(target, ReplaceStage::Stat, e))?;

        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let temp = tempfile::Builder::new()
            .prefix(&options.temp_prefix)
            .suffix(&options.temp_suffix)
            .tempfile_in(dir)
            .map_err(|e| Error::atomic_write(target, ReplaceStage::Create, e))?;

        #[cfg(unix)]
        copy_ownership(temp.path(), &metadata)
            .map_err(|e| Error::atomic_write(target, ReplaceStage::Ownership, e))?;

        fs::set_permissions(temp.path(), metadata.permissions())
            .map_err(|e| Error::atomic_write(target, ReplaceStage::Permissions, e))?;

        debug!(
            path = %target.display(),
            temp = %temp.path().display(),
            "Opened temporary file for atomic replace"
        );

        Ok(Self {
            target: target.to_path_buf(),
            writer: BufWriter::new(temp),
            sync: options.sync,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path of the temporary file that will replace the target
    pub fn temp_path(&self) -> &Path {
        self.writer.get_ref().path()
    }

    /// Append bytes to the new content
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.writer
            .write_all(data)
            .map_err(|e| Error::atomic_write(&self.target, ReplaceStage::Write, e))
    }

    /// Flush, optionally fsync, and rename the temporary file over the target
    pub fn commit(self) -> Result<()> {
        let target = self.target;
        let temp = self
            .writer
            .into_inner()
            .map_err(|e| Error::atomic_write(&target, ReplaceStage::Write, e.into_error()))?;

        if self.sync {
            temp.as_file()
                .sync_all()
                .map_err(|e| Error::atomic_write(&target, ReplaceStage::Sync, e))?;
        }

        temp.persist(&target)
            .map_err(|e| Error::atomic_write(&target, ReplaceStage::Rename, e.error))?;

        debug!(path = %target.display(), "Atomic replace committed");
        Ok(())
    }
}

impl std::fmt::Debug for AtomicFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicFile")
            .field("target", &self.target)
            .field("temp", &self.temp_path())
            .field("sync", &self.sync)
            .finish()
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(unix)]
fn copy_ownership(temp: &Path, target: &fs::Metadata) -> std::io::Result<()> {
    let current = fs::metadata(temp)?;
    if current.uid() == target.uid() && current.gid() == target.gid() {
        return Ok(());
    }
    std::os::unix::fs::chown(temp, Some(target.uid()), Some(target.gid()))
}

/// Replace `target` with whatever `write` produces.
///
/// If `write` returns an error (or panics) the temporary file is removed and
/// `target` is left exactly as it was.
pub fn replace_atomically<T, F>(target: &Path, options: &ReplaceOptions, write: F) -> Result<T>
where
    F: FnOnce(&mut AtomicFile) -> Result<T>,
{
    let mut file = AtomicFile::begin(target, options)?;
    let value = write(&mut file)?;
    file.commit()?;
    Ok(value)
}
