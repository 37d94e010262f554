use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::StorageError;

use super::{StoreBackend, StoreContents};

/// In-memory store backend backed by a `HashMap`. Used for testing and for
/// throwaway databases.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    stores: RwLock<HashMap<String, StoreContents>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&self, name: &str) -> Result<Option<StoreContents>, StorageError> {
        Ok(self.stores.read().get(name).cloned())
    }

    fn save(&self, name: &str, contents: &StoreContents) -> Result<(), StorageError> {
        self.stores
            .write()
            .insert(name.to_string(), contents.clone());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.stores.write().remove(name).is_some())
    }

    fn contains(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.stores.read().contains_key(name))
    }

    fn names(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = self.stores.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
