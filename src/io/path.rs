//! Path-to-stream adapter.

use crate::{Error, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Turns filesystem paths into byte streams.
///
/// Reads map a missing file to [`Error::NotFound`]. Writes go to a temporary
/// file beside the destination and only replace it on [`PendingFile::commit`],
/// so an abandoned attempt never leaves a partial file behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathAdapter;

impl PathAdapter {
    /// Opens `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the path does not exist, or
    /// [`Error::Io`] for any other failure.
    pub fn open(path: &Path) -> Result<File> {
        File::open(path).map_err(|e| map_open_error(path, e))
    }

    /// Reads the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`PathAdapter::open`].
    pub fn read(path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| map_open_error(path, e))
    }

    /// Starts an atomic write to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the destination directory does not
    /// exist, or [`Error::Io`] if the temporary file cannot be created.
    pub fn create(path: &Path) -> Result<PendingFile> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir).map_err(|e| map_open_error(dir, e))?;
        Ok(PendingFile {
            temp,
            target: path.to_path_buf(),
        })
    }
}

fn map_open_error(path: &Path, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::NotFound(path.to_path_buf())
    } else {
        Error::io(format!("open {}", path.display()), e)
    }
}

/// A write in progress; dropped without commit, it leaves the destination
/// untouched.
#[derive(Debug)]
pub struct PendingFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl PendingFile {
    /// The file to write into.
    pub fn file_mut(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }

    /// The destination the file will replace.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flushes and moves the file into place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be synced or renamed.
    pub fn commit(self) -> Result<()> {
        let Self { temp, target } = self;
        temp.as_file()
            .sync_all()
            .map_err(|e| Error::io(format!("sync {}", target.display()), e))?;
        temp.persist(&target)
            .map_err(|e| Error::io(format!("replace {}", target.display()), e.error))?;
        Ok(())
    }
}
