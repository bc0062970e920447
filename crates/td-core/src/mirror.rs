//! Mirror directories of topic bodies.
//!
//! Each mirror holds at most one `<name>.md` file per topic containing the
//! raw body text. The store keeps three of them: `old/` (last known
//! synchronized state), `new/` (working state the user edits) and `tmp/`
//! (scratch area for a full refresh).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{TdError, TdResult};
use crate::fsutil::{read_lenient, remove_if_exists, reset_dir};
use crate::topic::{file_name, EXTENSION};

/// One mirror directory.
#[derive(Debug, Clone)]
pub struct Mirror {
    dir: PathBuf,
}

impl Mirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `name`'s body.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(file_name(name))
    }

    /// Create or overwrite the body file for `name`.
    ///
    /// Fails if the directory does not exist or is not writable.
    pub fn write_body(&self, name: &str, body: &str) -> TdResult<()> {
        let path = self.path(name);
        debug!(path = %path.display(), bytes = body.len(), "write body");
        fs::write(path, body)?;
        Ok(())
    }

    /// Body text for `name`; empty when the file does not exist.
    ///
    /// Lossy: only for display and status, never for what gets pushed.
    pub fn read_body(&self, name: &str) -> String {
        String::from_utf8_lossy(&self.read_bytes(name)).into_owned()
    }

    /// Body text for `name`, exactly as stored.
    ///
    /// Any read failure is an error, and so are bytes that are not UTF-8.
    pub fn read_text(&self, name: &str) -> TdResult<String> {
        let path = self.path(name);
        let bytes = fs::read(&path)?;
        String::from_utf8(bytes).map_err(|e| {
            let msg = format!("{} is not valid UTF-8: {}", path.display(), e.utf8_error());
            TdError::Storage(io::Error::new(io::ErrorKind::InvalidData, msg))
        })
    }

    /// Raw body bytes for `name`; empty when the file does not exist.
    pub fn read_bytes(&self, name: &str) -> Vec<u8> {
        read_lenient(&self.path(name))
    }

    /// Delete `name`'s body file. Absence is not an error.
    pub fn remove(&self, name: &str) -> TdResult<()> {
        let path = self.path(name);
        debug!(path = %path.display(), "remove body");
        remove_if_exists(&path)?;
        Ok(())
    }

    /// Rename `from`'s body file to `to`. A missing source is not an error.
    pub fn rename(&self, from: &str, to: &str) -> TdResult<()> {
        let src = self.path(from);
        let dst = self.path(to);
        debug!(from = %src.display(), to = %dst.display(), "rename body");
        match fs::rename(&src, &dst) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Remove every entry and recreate the directory empty.
    pub fn clear(&self) -> TdResult<()> {
        debug!(dir = %self.dir.display(), "clear mirror");
        reset_dir(&self.dir)?;
        Ok(())
    }

    /// Create the directory if it is missing.
    pub fn ensure(&self) -> TdResult<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Destructively replace `dest` with a file-for-file copy of this mirror.
    ///
    /// `dest` is removed and recreated first. Copying stops at the first
    /// failure and files already copied are left in place.
    pub fn copy_tree(&self, dest: &Mirror) -> TdResult<usize> {
        dest.clear()?;
        let mut copied = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            fs::copy(entry.path(), dest.dir.join(entry.file_name()))?;
            copied += 1;
        }
        debug!(
            from = %self.dir.display(),
            to = %dest.dir.display(),
            copied,
            "mirror copied"
        );
        Ok(copied)
    }

    /// Topic names that have a body file in this mirror, sorted.
    pub fn names(&self) -> TdResult<Vec<String>> {
        let mut names = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
