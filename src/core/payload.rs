// src/core/payload.rs

//! The on-disk side of shipped binaries: the payload directory, the platform archive inside
//! a plugin bundle, and the stamp recording which archive produced the current payload.

use crate::constants::{
    PAYLOAD_ARCHIVE_FILENAME, PAYLOAD_ENV_FILENAME, PAYLOAD_STAMP_FILENAME,
};
use crate::core::tool_registry::RegistryError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while extracting, validating or registering a payload.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// A filesystem operation failed.
    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The archive could not be read or decompressed.
    #[error("Invalid payload archive '{}': {source}", .path.display())]
    Archive {
        /// The archive path.
        path: PathBuf,
        /// The decompression error.
        #[source]
        source: zip::result::ZipError,
    },
    /// An archive entry would land outside the payload directory.
    #[error("Archive entry '{name}' points outside the payload directory.")]
    UnsafeEntry {
        /// The raw entry name.
        name: String,
    },
    /// A packaged resource expected after extraction is missing.
    #[error("Missing packaged resource: '{}'", .path.display())]
    MissingResource {
        /// Where the resource was expected.
        path: PathBuf,
    },
    /// The packaged environment file has a line that is not a property.
    #[error("Malformed line {line} in '{}': {content}", .path.display())]
    MalformedEnvironment {
        /// The environment file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// The offending line.
        content: String,
    },
    /// The tool registry rejected an update.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The progress monitor requested cancellation.
    #[error("Extraction was cancelled.")]
    Cancelled,
}

impl PayloadError {
    /// Builds an [`PayloadError::Io`] for `path`.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The directory that holds an extracted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDirectory {
    root: PathBuf,
    executable_subdir: PathBuf,
}

impl PayloadDirectory {
    /// A payload rooted at `root` with executables under `root/executable_subdir`.
    pub fn new(root: impl Into<PathBuf>, executable_subdir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            executable_subdir: executable_subdir.into(),
        }
    }

    /// The payload root.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// The directory holding the executables.
    pub fn executable_dir(&self) -> PathBuf {
        self.root.join(&self.executable_subdir)
    }

    /// The packaged environment file.
    pub fn env_file(&self) -> PathBuf {
        self.root.join(PAYLOAD_ENV_FILENAME)
    }

    /// The extraction stamp.
    pub fn stamp_file(&self) -> PathBuf {
        self.root.join(PAYLOAD_STAMP_FILENAME)
    }

    /// Whether the payload root is missing or holds no entries. Unreadable counts as empty.
    pub fn is_empty(&self) -> bool {
        match fs::read_dir(&self.root) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    /// Deletes the payload root and everything below it. A missing root is not an error.
    pub fn clean(&self) -> Result<(), PayloadError> {
        unlock_directories(&self.root);
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PayloadError::io(&self.root, e)),
        }
    }

    /// Creates the payload root if needed.
    pub fn ensure_exists(&self) -> Result<(), PayloadError> {
        fs::create_dir_all(&self.root).map_err(|e| PayloadError::io(&self.root, e))
    }
}

/// Restores owner access on every directory below `root` so that its entries can be removed.
#[cfg(unix)]
fn unlock_directories(root: &Path) {
    use std::os::unix::fs::PermissionsExt;
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_dir() {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let mut permissions = metadata.permissions();
        if permissions.mode() & 0o700 != 0o700 {
            permissions.set_mode(permissions.mode() | 0o700);
            if let Err(e) = fs::set_permissions(entry.path(), permissions) {
                log::debug!("Could not unlock {}: {}", entry.path().display(), e);
            }
        }
    }
}

#[cfg(not(unix))]
fn unlock_directories(_root: &Path) {}

/// The platform archive shipped inside a plugin bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadArchive {
    path: PathBuf,
}

impl PayloadArchive {
    /// Wraps an archive at a known location.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Looks for the archive of the current platform in `bundle_dir`. Candidates, in order:
    /// `<os>-<arch>/binaries.zip`, `<os>/binaries.zip`, `binaries.zip`.
    pub fn locate(bundle_dir: &Path) -> Option<Self> {
        let os = std::env::consts::OS;
        let arch = std::env::consts::ARCH;
        let candidates = [
            bundle_dir
                .join(format!("{os}-{arch}"))
                .join(PAYLOAD_ARCHIVE_FILENAME),
            bundle_dir.join(os).join(PAYLOAD_ARCHIVE_FILENAME),
            bundle_dir.join(PAYLOAD_ARCHIVE_FILENAME),
        ];
        let found = candidates.into_iter().find(|c| c.is_file());
        match &found {
            Some(path) => log::debug!("Found payload archive at {}", path.display()),
            None => log::debug!("No payload archive in {}", bundle_dir.display()),
        }
        found.map(Self::new)
    }

    /// The archive path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The hex-encoded blake3 hash of the archive content.
    pub fn content_hash(&self) -> Result<String, PayloadError> {
        let bytes = fs::read(&self.path).map_err(|e| PayloadError::io(&self.path, e))?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }
}

/// Records which archive produced the extracted payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PayloadStamp {
    /// Hash of the archive that was extracted.
    pub archive_hash: String,
    /// Number of archive entries written.
    pub entries: usize,
}

impl PayloadStamp {
    /// Reads the stamp of `payload`, if one exists and parses.
    pub fn read(payload: &PayloadDirectory) -> Option<Self> {
        let content = fs::read_to_string(payload.stamp_file()).ok()?;
        toml::from_str(&content).ok()
    }

    /// Writes this stamp into `payload`.
    pub fn write(&self, payload: &PayloadDirectory) -> Result<(), PayloadError> {
        let path = payload.stamp_file();
        let content = toml::to_string_pretty(self).map_err(|e| {
            PayloadError::io(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        fs::write(&path, content).map_err(|e| PayloadError::io(&path, e))
    }
}

// MARK: --- UNIT TESTS ---
