//! Filesystem utilities: crash-safe writes and the two read/write policies.
//!
//! Reads that feed informational paths are lenient: a missing or unreadable
//! file is the same as an empty one. Writes are strict and always surface
//! their failure.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

use crate::error::TdResult;

/// Write data to a file atomically using temp-file-then-rename.
///
/// On POSIX, `rename()` within the same filesystem is atomic: either the
/// old file or the new file is visible, never a partial write. We fsync
/// the temp file before renaming so the data is durable on disk.
pub fn atomic_write(path: &Path, data: &[u8]) -> TdResult<()> {
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_data()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a file, treating any failure as empty content.
///
/// `NotFound` is silent; other errors are logged and swallowed.
pub fn read_lenient(path: &Path) -> Vec<u8> {
    match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "read failed, treating as empty");
            Vec::new()
        }
    }
}

/// Remove a file, ignoring `NotFound`.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Remove a directory tree if present and recreate it empty.
pub fn reset_dir(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("topics.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!dir.path().join("topics.tmp").exists());
    }

    #[test]
    fn test_read_lenient_missing_is_empty() {
        let dir = tempdir().unwrap();
        assert!(read_lenient(&dir.path().join("nope.md")).is_empty());
    }

    #[test]
    fn test_remove_if_exists_tolerates_absence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.md");
        remove_if_exists(&path).unwrap();
        fs::write(&path, "x").unwrap();
        remove_if_exists(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_reset_dir_clears_entries() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("tmp");
        fs::create_dir_all(&tmp).unwrap();
        fs::write(tmp.join("stale.md"), "old").unwrap();

        reset_dir(&tmp).unwrap();
        assert!(tmp.is_dir());
        assert_eq!(fs::read_dir(&tmp).unwrap().count(), 0);

        // Works when the directory does not exist yet.
        let fresh = dir.path().join("fresh");
        reset_dir(&fresh).unwrap();
        assert!(fresh.is_dir());
    }
}
