//! Database configuration.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory used when no root is configured.
pub const DEFAULT_ROOT: &str = "db_files";

/// Environment variable overriding [`DatabaseConfig::root`].
pub const ROOT_ENV: &str = "TABULON_ROOT";

/// Environment variable overriding [`DatabaseConfig::sync_mode`] (`full` or `none`).
pub const SYNC_ENV: &str = "TABULON_SYNC";

/// Controls when `fsync` is called during a store commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Fsync every store file and its directory on commit (default).
    #[default]
    Full,
    /// Skip fsync entirely. Data may be lost on crash but writes are much
    /// faster. Useful for bulk loads and tests.
    None,
}

impl SyncMode {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" => Some(SyncMode::Full),
            "none" | "off" => Some(SyncMode::None),
            _ => None,
        }
    }
}

/// What to do when another process holds the database directory lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Fail immediately with `StorageError::Locked` (default).
    #[default]
    Try,
    /// Block until the lock is released.
    Block,
}

/// Settings for opening an on-disk database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory holding the catalog, record and index store files.
    pub root: PathBuf,
    pub sync_mode: SyncMode,
    pub lock_mode: LockMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            sync_mode: SyncMode::default(),
            lock_mode: LockMode::default(),
        }
    }
}

impl DatabaseConfig {
    /// Config rooted at `root` with default settings.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::default().with_root(root)
    }

    /// Defaults overridden by `TABULON_ROOT` and `TABULON_SYNC`.
    ///
    /// Unrecognised `TABULON_SYNC` values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(root) = lookup(ROOT_ENV)
            && !root.is_empty()
        {
            config = config.with_root(root);
        }
        if let Some(sync) = lookup(SYNC_ENV) {
            match SyncMode::from_env_value(&sync) {
                Some(mode) => config = config.with_sync_mode(mode),
                None => tracing::warn!(value = %sync, "ignoring unrecognised TABULON_SYNC value"),
            }
        }
        config
    }

    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn with_lock_mode(mut self, lock_mode: LockMode) -> Self {
        self.lock_mode = lock_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.root, PathBuf::from("db_files"));
        assert_eq!(config.sync_mode, SyncMode::Full);
        assert_eq!(config.lock_mode, LockMode::Try);
    }

    #[test]
    fn test_builder() {
        let config = DatabaseConfig::new("/tmp/x")
            .with_sync_mode(SyncMode::None)
            .with_lock_mode(LockMode::Block);
        assert_eq!(config.root, PathBuf::from("/tmp/x"));
        assert_eq!(config.sync_mode, SyncMode::None);
        assert_eq!(config.lock_mode, LockMode::Block);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: DatabaseConfig =
            serde_json::from_str(r#"{"root": "data", "sync_mode": "none"}"#).unwrap();
        assert_eq!(config.root, PathBuf::from("data"));
        assert_eq!(config.sync_mode, SyncMode::None);
        assert_eq!(config.lock_mode, LockMode::Try);
    }

    #[test]
    fn test_from_lookup() {
        let config = DatabaseConfig::from_lookup(|name| match name {
            ROOT_ENV => Some("/var/lib/tabulon".to_string()),
            SYNC_ENV => Some("none".to_string()),
            _ => None,
        });
        assert_eq!(config.root, PathBuf::from("/var/lib/tabulon"));
        assert_eq!(config.sync_mode, SyncMode::None);

        let config = DatabaseConfig::from_lookup(|name| match name {
            ROOT_ENV => Some(String::new()),
            SYNC_ENV => Some("sometimes".to_string()),
            _ => None,
        });
        assert_eq!(config, DatabaseConfig::default());
    }

    #[test]
    fn test_sync_mode_env_values() {
        assert_eq!(SyncMode::from_env_value("FULL"), Some(SyncMode::Full));
        assert_eq!(SyncMode::from_env_value(" none "), Some(SyncMode::None));
        assert_eq!(SyncMode::from_env_value("off"), Some(SyncMode::None));
        assert_eq!(SyncMode::from_env_value("sometimes"), None);
    }
}
