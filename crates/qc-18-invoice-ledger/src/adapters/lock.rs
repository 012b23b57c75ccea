//! # Data Directory Lock
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on
//! Windows). One process at a time may open a ledger directory.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::domain::errors::KVStoreError;

/// Exclusive lock on a ledger data directory.
///
/// Released on drop. The OS also releases it if the process dies, so a
/// leftover lock file is never stale.
#[derive(Debug)]
pub struct DatabaseLock {
    /// Kept open to hold the lock.
    file: File,
    path: PathBuf,
}

impl DatabaseLock {
    /// Lock file name
    const LOCK_FILE: &'static str = "LOCK";

    /// Acquire the lock, retrying with exponential backoff until `timeout`.
    ///
    /// # Errors
    ///
    /// - `KVStoreError::Locked` if another process still holds it at the deadline
    /// - `KVStoreError::IOError` if the lock file cannot be opened
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, KVStoreError> {
        let deadline = Instant::now() + timeout;
        let path = data_dir.join(Self::LOCK_FILE);
        let mut retry_delay = Duration::from_millis(10);

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| KVStoreError::IOError {
                message: format!("Failed to open lock file {}: {}", path.display(), e),
            })?;

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(_) if Instant::now() < deadline => {
                    std::thread::sleep(retry_delay);
                    retry_delay = (retry_delay * 2).min(Duration::from_millis(250));
                }
                Err(_) => {
                    return Err(KVStoreError::Locked {
                        path: path.display().to_string(),
                    });
                }
            }
        }

        // Informational only; the flock is what excludes other processes.
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());

        Ok(Self { file, path })
    }

    /// Get the path to the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DatabaseLock {
    fn drop(&mut self) {
        #[allow(clippy::incompatible_msrv)]
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock = DatabaseLock::acquire(dir.path(), Duration::from_millis(50)).unwrap();
        assert!(lock.path().ends_with("LOCK"));
        drop(lock);

        // Released on drop, so it can be taken again.
        DatabaseLock::acquire(dir.path(), Duration::from_millis(50)).unwrap();
    }

    #[test]
    fn test_second_acquire_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let _held = DatabaseLock::acquire(dir.path(), Duration::from_millis(50)).unwrap();

        let result = DatabaseLock::acquire(dir.path(), Duration::from_millis(30));
        assert!(matches!(result, Err(KVStoreError::Locked { .. })));
    }
}
