//! Record store: the per-table mapping from encoded primary key to record.

use serde_json::Value;

use crate::error::StorageError;
use crate::storage::{MapHandle, StoreBackend};
use crate::types::{Record, record_store_name};

/// One scoped acquisition of a table's record store.
#[derive(Debug)]
pub struct RecordStore<'a> {
    handle: MapHandle<'a>,
}

impl<'a> RecordStore<'a> {
    /// Open the record store of `table`, empty if it was never written.
    pub fn open(backend: &'a dyn StoreBackend, table: &str) -> Result<Self, StorageError> {
        Ok(Self {
            handle: MapHandle::open(backend, record_store_name(table))?,
        })
    }

    /// Start an empty record store for `table`, replacing any existing one on
    /// commit.
    pub fn create(backend: &'a dyn StoreBackend, table: &str) -> Self {
        Self {
            handle: MapHandle::create(backend, record_store_name(table)),
        }
    }

    pub fn len(&self) -> usize {
        self.handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handle.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Result<Option<&Record>, StorageError> {
        self.handle
            .get(key)
            .map(|value| as_record(self.handle.name(), key, value))
            .transpose()
    }

    /// Insert or replace the record under `key`.
    pub fn put(&mut self, key: &str, record: Record) {
        self.handle.put(key, Value::Object(record));
    }

    /// Remove and return the record under `key`.
    pub fn remove(&mut self, key: &str) -> Result<Option<Record>, StorageError> {
        match self.handle.delete(key) {
            None => Ok(None),
            Some(Value::Object(record)) => Ok(Some(record)),
            Some(_) => Err(not_a_record(self.handle.name(), key)),
        }
    }

    /// All records in ascending encoded-key order.
    pub fn scan(&self) -> impl Iterator<Item = Result<(&str, &Record), StorageError>> + '_ {
        self.handle.iter().map(|(key, value)| {
            as_record(self.handle.name(), key, value).map(|record| (key.as_str(), record))
        })
    }

    /// Release the store for staging in a [`WriteSet`](crate::storage::WriteSet).
    pub fn into_handle(self) -> MapHandle<'a> {
        self.handle
    }

    pub fn commit(self) -> Result<(), StorageError> {
        self.handle.commit()
    }
}

fn as_record<'v>(store: &str, key: &str, value: &'v Value) -> Result<&'v Record, StorageError> {
    value.as_object().ok_or_else(|| not_a_record(store, key))
}

fn not_a_record(store: &str, key: &str) -> StorageError {
    StorageError::Corrupted {
        store: store.to_string(),
        reason: format!("entry {key} is not a record object"),
    }
}
