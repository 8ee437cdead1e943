//! Advisory file lock serializing store writers across invocations.
//!
//! The lock is a sidecar file created with `create_new`; holding the guard
//! means owning the file, and dropping it removes the file. A lock file
//! older than [`STALE_AFTER`] is treated as left over from a crashed
//! invocation and is broken.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use tracing::warn;

use crate::StoreError;

/// How long to wait for a competing writer before giving up.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lock files older than this are considered abandoned.
const STALE_AFTER: Duration = Duration::from_secs(60);

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Held for the duration of one write operation.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    pub fn acquire(path: &Path) -> Result<Self, StoreError> {
        let deadline = Instant::now() + ACQUIRE_TIMEOUT;
        loop {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
            {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if lock_is_stale(path) {
                        warn!(path = %path.display(), "breaking stale version store lock");
                        let _ = std::fs::remove_file(path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(StoreError::Locked);
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn lock_is_stale(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|modified| {
            SystemTime::now()
                .duration_since(modified)
                .map(|age| age > STALE_AFTER)
                .unwrap_or(false)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("test.lock");

        let guard = LockGuard::acquire(&lock_path).unwrap();
        assert!(lock_path.exists());
        drop(guard);
        assert!(!lock_path.exists());

        // Re-acquirable after release.
        let _again = LockGuard::acquire(&lock_path).unwrap();
    }

    #[test]
    fn contended_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("test.lock");
        let _holder = LockGuard::acquire(&lock_path).unwrap();

        let err = LockGuard::acquire(&lock_path).unwrap_err();
        assert!(matches!(err, StoreError::Locked));
    }
}
