//! Advisory lock over a td root directory.
//!
//! Mutating store operations hold an exclusive `flock` on `td.lock` for
//! their whole duration. Reads never take it. The kernel drops the lock
//! with the process, so a crashed invocation cannot wedge the store.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::{TdError, TdResult};

/// Lock file inside the root sync directory.
pub const LOCK_FILE: &str = "td.lock";

const RETRY: Duration = Duration::from_millis(10);

/// Exclusive hold on a store. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Lock the store rooted at `root`, retrying until `timeout` elapses.
    ///
    /// Contention past the deadline is `LockTimeout`; any other failure to
    /// open or lock the file is `Storage`.
    pub fn acquire(root: &Path, timeout: Duration) -> TdResult<Self> {
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let deadline = Instant::now() + timeout;

        while let Err(e) = file.try_lock_exclusive() {
            if e.raw_os_error() != fs2::lock_contended_error().raw_os_error() {
                return Err(e.into());
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(path = %path.display(), ?timeout, "store is locked by another td");
                return Err(TdError::LockTimeout);
            }
            thread::sleep(RETRY.min(deadline - now));
        }

        debug!(path = %path.display(), "store locked");
        Ok(StoreLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            debug!(path = %self.path.display(), error = %e, "unlock failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use tempfile::tempdir;

    #[test]
    fn test_lock_file_lives_in_root() {
        let dir = tempdir().unwrap();
        let lock = StoreLock::acquire(dir.path(), Duration::ZERO).unwrap();
        assert_eq!(lock.path(), dir.path().join(LOCK_FILE));
        assert!(lock.path().is_file());
    }

    #[test]
    fn test_second_holder_times_out() {
        let dir = tempdir().unwrap();
        let _held = StoreLock::acquire(dir.path(), Duration::ZERO).unwrap();

        let start = Instant::now();
        let second = StoreLock::acquire(dir.path(), Duration::from_millis(60));
        assert!(matches!(second, Err(TdError::LockTimeout)));
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_waiter_gets_lock_once_holder_drops() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let (held_tx, held_rx) = bounded(0);

        let holder = thread::spawn(move || {
            let _lock = StoreLock::acquire(&root, Duration::ZERO).unwrap();
            held_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(200));
        });

        held_rx.recv().unwrap();
        assert!(StoreLock::acquire(dir.path(), Duration::ZERO).is_err());
        assert!(StoreLock::acquire(dir.path(), Duration::from_secs(2)).is_ok());
        holder.join().unwrap();
    }

    #[test]
    fn test_missing_root_is_a_storage_error() {
        let dir = tempdir().unwrap();
        let result = StoreLock::acquire(&dir.path().join("absent"), Duration::from_secs(1));
        assert!(matches!(result, Err(TdError::Storage(_))));
    }
}
