//! Local persisted state: a handful of fixed string keys mapped to files in
//! the user data directory. The relay never touches this; it belongs to the
//! chat client alone.

use directories::ProjectDirs;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Errors that can occur when writing persisted state to disk.
#[derive(Debug)]
pub enum PersistError {
    /// The platform data directory could not be determined.
    NoDataDir,
    /// Failed to create or replace the file backing a key.
    Write {
        /// Path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::NoDataDir => {
                write!(f, "could not determine a data directory for this platform")
            }
            PersistError::Write { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::NoDataDir => None,
            PersistError::Write { source, .. } => Some(source),
        }
    }
}

/// Key-value file store under a single directory, one file per key.
/// Writes go through a temp file in the same directory so a crash mid-write
/// never leaves a torn snapshot behind.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open the store at the platform data directory, creating it if needed.
    pub fn open_default() -> Result<Self, PersistError> {
        let proj_dirs =
            ProjectDirs::from("org", "solace", "solace").ok_or(PersistError::NoDataDir)?;
        Ok(Self::at(proj_dirs.data_dir().to_path_buf()))
    }

    /// Open the store rooted at an explicit directory.
    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Read the value stored under `key`. A missing file is `None`; an
    /// unreadable one is logged and treated the same way.
    pub fn read(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!("failed to read {}: {err}", path.display());
                None
            }
        }
    }

    /// Replace the value stored under `key` atomically.
    pub fn write(&self, key: &str, contents: &str) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).map_err(|source| PersistError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(key);
        let wrap = |source: std::io::Error| PersistError::Write {
            path: path.clone(),
            source,
        };

        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(wrap)?;
        temp_file.write_all(contents.as_bytes()).map_err(wrap)?;
        temp_file.as_file_mut().sync_all().map_err(wrap)?;
        temp_file
            .persist(&path)
            .map_err(|err| wrap(err.error))?;
        Ok(())
    }

    /// Delete the value stored under `key`. Removing a missing key is not an
    /// error.
    pub fn remove(&self, key: &str) -> Result<(), PersistError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistError::Write { path, source }),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}
