// src/core/archive.rs

//! Zip decompression for payload archives.

use crate::core::payload::PayloadError;
use crate::core::progress::ProgressMonitor;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

fn open(archive_path: &Path) -> Result<ZipArchive<File>, PayloadError> {
    let file = File::open(archive_path).map_err(|e| PayloadError::io(archive_path, e))?;
    ZipArchive::new(file).map_err(|source| PayloadError::Archive {
        path: archive_path.to_path_buf(),
        source,
    })
}

/// Number of entries (files and directories) in the archive.
pub fn count_entries(archive_path: &Path) -> Result<usize, PayloadError> {
    Ok(open(archive_path)?.len())
}

/// Decompresses every entry of `archive_path` below `dest`, reporting one unit of work per
/// entry. Entries whose names escape `dest` abort the extraction. Returns the number of
/// entries processed.
pub fn decompress_to(
    archive_path: &Path,
    dest: &Path,
    monitor: &mut dyn ProgressMonitor,
) -> Result<usize, PayloadError> {
    let mut archive = open(archive_path)?;
    let archive_err = |source| PayloadError::Archive {
        path: archive_path.to_path_buf(),
        source,
    };

    // Directory modes are applied last so read-only directories can still be filled.
    let mut directory_modes: Vec<(PathBuf, u32)> = Vec::new();

    for index in 0..archive.len() {
        if monitor.is_cancelled() {
            return Err(PayloadError::Cancelled);
        }
        let mut entry = archive.by_index(index).map_err(archive_err)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| PayloadError::UnsafeEntry {
                name: entry.name().to_string(),
            })?;
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| PayloadError::io(&target, e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| PayloadError::io(parent, e))?;
            }
            let mut out = File::create(&target).map_err(|e| PayloadError::io(&target, e))?;
            io::copy(&mut entry, &mut out).map_err(|e| PayloadError::io(&target, e))?;
        }

        if let Some(mode) = entry.unix_mode() {
            if entry.is_dir() {
                directory_modes.push((target.clone(), mode));
            } else {
                set_mode(&target, mode)?;
            }
        }

        log::trace!("Extracted {}", target.display());
        monitor.worked(1);
    }

    // Deepest first, so a parent never turns read-only before its children are done.
    directory_modes.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
    for (path, mode) in &directory_modes {
        set_mode(path, *mode)?;
    }
    Ok(archive.len())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), PayloadError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
        .map_err(|e| PayloadError::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), PayloadError> {
    Ok(())
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::progress::{NullProgress, RecordingProgress};
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    /// Builds a zip at `path` from `(name, content)` pairs. Names ending in `/` are directories.
    pub(crate) fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        write_zip_with_dir_mode(path, entries, 0o755);
    }

    /// Like [`write_zip`], recording `dir_mode` for directory entries.
    pub(crate) fn write_zip_with_dir_mode(path: &Path, entries: &[(&str, &str)], dir_mode: u32) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default().unix_permissions(0o644);
        let dir_options = SimpleFileOptions::default().unix_permissions(dir_mode);
        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, dir_options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_decompress_reports_each_entry() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("binaries.zip");
        write_zip(
            &zip_path,
            &[("bin/", ""), ("bin/tool", "#!/bin/sh\n"), ("binaries.ini", "A=1\n")],
        );
        assert_eq!(count_entries(&zip_path).unwrap(), 3);

        let dest = dir.path().join("out");
        let mut monitor = RecordingProgress::default();
        let written = decompress_to(&zip_path, &dest, &mut monitor).unwrap();
        assert_eq!(written, 3);
        assert_eq!(monitor.events, vec!["worked:1", "worked:1", "worked:1"]);
        assert_eq!(
            fs::read_to_string(dest.join("bin").join("tool")).unwrap(),
            "#!/bin/sh\n"
        );
    }

    #[test]
    fn test_entries_escaping_destination_are_rejected() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("evil.zip");
        write_zip(&zip_path, &[("../escape.txt", "nope")]);

        let dest = dir.path().join("out");
        let err = decompress_to(&zip_path, &dest, &mut NullProgress).unwrap_err();
        assert!(matches!(err, PayloadError::UnsafeEntry { .. }));
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_cancellation_stops_between_entries() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("binaries.zip");
        write_zip(&zip_path, &[("a", "1"), ("b", "2"), ("c", "3")]);

        let mut monitor = RecordingProgress::cancelling_after(1);
        let err = decompress_to(&zip_path, &dir.path().join("out"), &mut monitor).unwrap_err();
        assert!(matches!(err, PayloadError::Cancelled));
        assert_eq!(monitor.events, vec!["worked:1"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directories_are_filled_before_locking() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("binaries.zip");
        write_zip_with_dir_mode(
            &zip_path,
            &[("bin/", ""), ("bin/tool", "#!/bin/sh\n"), ("binaries.ini", "")],
            0o555,
        );

        let dest = dir.path().join("out");
        let bin = dest.join("bin");
        decompress_to(&zip_path, &dest, &mut NullProgress).unwrap();
        assert_eq!(fs::read_to_string(bin.join("tool")).unwrap(), "#!/bin/sh\n");
        assert_eq!(fs::metadata(&bin).unwrap().permissions().mode() & 0o777, 0o555);

        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_garbage_archive_is_an_archive_error() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("broken.zip");
        fs::write(&zip_path, b"not a zip").unwrap();
        assert!(matches!(
            count_entries(&zip_path),
            Err(PayloadError::Archive { .. })
        ));
    }
}
