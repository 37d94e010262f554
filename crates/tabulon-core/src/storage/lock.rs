use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;
use tracing::warn;

use crate::config::LockMode;
use crate::error::StorageError;

/// A file-based lock using advisory locking (`flock(2)` on Unix).
///
/// The lock is released automatically when this struct is dropped (the
/// underlying file descriptor is closed).
#[derive(Debug)]
pub struct FileLock {
    _file: File,
}

impl FileLock {
    /// Acquire an exclusive lock on `path` according to `mode`.
    pub fn acquire(path: &Path, mode: LockMode) -> Result<Self, StorageError> {
        match mode {
            LockMode::Try => Self::try_exclusive(path),
            LockMode::Block => Self::exclusive(path),
        }
    }

    /// Acquire an exclusive (write) lock on the file at `path`.
    ///
    /// Creates the lock file if it does not exist. Blocks until the lock is acquired.
    pub fn exclusive(path: &Path) -> Result<Self, StorageError> {
        let file = open_lock_file(path)?;
        file.lock_exclusive().map_err(|_| StorageError::Locked)?;
        Ok(Self { _file: file })
    }

    /// Try to acquire an exclusive lock without blocking.
    /// Returns `Err(StorageError::Locked)` if the lock is held.
    pub fn try_exclusive(path: &Path) -> Result<Self, StorageError> {
        let file = open_lock_file(path)?;
        file.try_lock_exclusive().map_err(|_| {
            warn!(path = %path.display(), "database directory is locked by another process");
            StorageError::Locked
        })?;
        Ok(Self { _file: file })
    }
}

fn open_lock_file(path: &Path) -> Result<File, StorageError> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_exclusive_blocks_try() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("LOCK");

        let _lock = FileLock::exclusive(&lock_path).unwrap();

        // flock is per open file description, so a second fd in the same
        // process conflicts.
        match FileLock::acquire(&lock_path, LockMode::Try) {
            Err(StorageError::Locked) => {}
            other => panic!("expected Locked, got {other:?}"),
        }
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("LOCK");

        {
            let _lock = FileLock::try_exclusive(&lock_path).unwrap();
        }
        let _again = FileLock::acquire(&lock_path, LockMode::Block).unwrap();
    }
}
