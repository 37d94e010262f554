//! Persistent mappings: the backend trait, scoped store handles, and the
//! in-memory and on-disk backends.
//!
//! Record stores, hash index stores and the catalog are all named maps from
//! string keys to JSON values. A [`MapHandle`] is one scoped acquisition of
//! such a map: it loads the contents, buffers mutations, and writes them
//! back only on [`MapHandle::commit`]. Dropping a handle without committing
//! discards its changes, so every early return releases cleanly.

pub mod file;
pub mod header;
pub mod lock;
pub mod memory;

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::trace;

use crate::error::StorageError;

pub use file::FileBackend;
pub use memory::MemoryBackend;

/// Full contents of one named store, ordered by key.
pub type StoreContents = BTreeMap<String, Value>;

/// Whole-store persistence for named maps.
///
/// Implementations must make `save` atomic per store: a concurrent or later
/// `load` sees either the old or the new contents, never a mix.
pub trait StoreBackend: Send + Sync + fmt::Debug {
    /// Read a store. `None` if it does not exist.
    fn load(&self, name: &str) -> Result<Option<StoreContents>, StorageError>;
    /// Replace a store's contents, creating it if needed.
    fn save(&self, name: &str, contents: &StoreContents) -> Result<(), StorageError>;
    /// Delete a store. Returns whether it existed.
    fn remove(&self, name: &str) -> Result<bool, StorageError>;
    fn contains(&self, name: &str) -> Result<bool, StorageError>;
    /// Names of all existing stores, sorted.
    fn names(&self) -> Result<Vec<String>, StorageError>;
}

/// A scoped acquisition of one named store.
pub struct MapHandle<'a> {
    backend: &'a dyn StoreBackend,
    name: String,
    entries: StoreContents,
    dirty: bool,
}

impl<'a> MapHandle<'a> {
    /// Open a store, starting empty if it does not exist yet.
    pub fn open(backend: &'a dyn StoreBackend, name: impl Into<String>) -> Result<Self, StorageError> {
        let name = name.into();
        let loaded = backend.load(&name)?;
        let dirty = loaded.is_none();
        Ok(Self {
            backend,
            name,
            entries: loaded.unwrap_or_default(),
            dirty,
        })
    }

    /// Open a store only if it exists.
    pub fn open_existing(
        backend: &'a dyn StoreBackend,
        name: impl Into<String>,
    ) -> Result<Option<Self>, StorageError> {
        let name = name.into();
        Ok(backend.load(&name)?.map(|entries| Self {
            backend,
            name,
            entries,
            dirty: false,
        }))
    }

    /// Start a fresh, empty store, replacing any existing one on commit.
    pub fn create(backend: &'a dyn StoreBackend, name: impl Into<String>) -> Self {
        Self {
            backend,
            name: name.into(),
            entries: StoreContents::new(),
            dirty: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        let value = self.entries.get_mut(key);
        if value.is_some() {
            self.dirty = true;
        }
        value
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace, returning the previous value.
    pub fn put(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.dirty = true;
        self.entries.insert(key.into(), value)
    }

    pub fn delete(&mut self, key: &str) -> Option<Value> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write buffered changes back to the backend and release the handle.
    pub fn commit(mut self) -> Result<(), StorageError> {
        if self.dirty {
            self.backend.save(&self.name, &self.entries)?;
            self.dirty = false;
        }
        Ok(())
    }
}

impl Drop for MapHandle<'_> {
    fn drop(&mut self) {
        if self.dirty {
            trace!(store = %self.name, "discarding uncommitted store changes");
        }
    }
}

impl fmt::Debug for MapHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapHandle")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Handles touched by one logical mutation, committed together in staging
/// order.
///
/// Stage the record store first and index stores after it, so a failure
/// between two saves never leaves an index ahead of its records. Each save
/// is atomic on its own; the set as a whole is not.
#[derive(Debug, Default)]
pub struct WriteSet<'a> {
    handles: Vec<MapHandle<'a>>,
}

impl<'a> WriteSet<'a> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    pub fn stage(&mut self, handle: MapHandle<'a>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Commit every staged handle in order. Stops at the first failure;
    /// handles after it are discarded.
    pub fn commit(self) -> Result<(), StorageError> {
        for handle in self.handles {
            handle.commit()?;
        }
        Ok(())
    }
}
