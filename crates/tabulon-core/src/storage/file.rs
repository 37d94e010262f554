use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::{DatabaseConfig, SyncMode};
use crate::error::StorageError;

use super::header::{decode_file, encode_file};
use super::lock::FileLock;
use super::{StoreBackend, StoreContents};

/// Extension of every store file under the database root.
pub const STORE_EXTENSION: &str = "tbl";

/// Name of the advisory lock file under the database root.
pub const LOCK_FILE: &str = "LOCK";

/// On-disk store backend: one checksummed file per store under a root
/// directory.
///
/// Saves are atomic per store: the new contents are written to a temp file
/// and renamed over the old one. Holding a `FileBackend` holds an exclusive
/// lock on the root directory.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    sync_mode: SyncMode,
    _lock: FileLock,
}

impl FileBackend {
    /// Open (creating if needed) the directory named by `config.root`.
    pub fn open(config: &DatabaseConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.root)?;
        let lock = FileLock::acquire(&config.root.join(LOCK_FILE), config.lock_mode)?;
        info!(root = %config.root.display(), sync = ?config.sync_mode, "opened store directory");
        Ok(Self {
            root: config.root.clone(),
            sync_mode: config.sync_mode,
            _lock: lock,
        })
    }

    /// Path of the file backing store `name`.
    pub fn store_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{STORE_EXTENSION}"))
    }

    fn sync_dir(&self) -> Result<(), StorageError> {
        if self.sync_mode == SyncMode::Full {
            File::open(&self.root)?.sync_all()?;
        }
        Ok(())
    }
}

impl StoreBackend for FileBackend {
    fn load(&self, name: &str) -> Result<Option<StoreContents>, StorageError> {
        let bytes = match fs::read(self.store_path(name)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let payload = decode_file(name, &bytes)?;
        let contents = serde_json::from_slice(payload).map_err(|e| StorageError::Corrupted {
            store: name.to_string(),
            reason: format!("failed to deserialize store contents: {e}"),
        })?;
        Ok(Some(contents))
    }

    fn save(&self, name: &str, contents: &StoreContents) -> Result<(), StorageError> {
        let payload = serde_json::to_vec(contents).map_err(|e| StorageError::Corrupted {
            store: name.to_string(),
            reason: format!("failed to serialize store contents: {e}"),
        })?;
        let bytes = encode_file(&payload);

        let target = self.store_path(name);
        let tmp = target.with_extension(format!("{STORE_EXTENSION}.tmp"));
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(&bytes)?;
            if self.sync_mode == SyncMode::Full {
                file.sync_all()?;
            }
        }
        fs::rename(&tmp, &target)?;
        self.sync_dir()?;
        debug!(store = name, entries = contents.len(), bytes = bytes.len(), "store saved");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool, StorageError> {
        match fs::remove_file(self.store_path(name)) {
            Ok(()) => {
                self.sync_dir()?;
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.store_path(name).try_exists()?)
    }

    fn names(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STORE_EXTENSION) {
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
