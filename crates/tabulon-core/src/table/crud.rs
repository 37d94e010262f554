use serde_json::Value;
use tracing::debug;

use crate::encoding::encode_key;
use crate::error::{Error, RecordError};
use crate::index::maintain_indexes;
use crate::record::RecordStore;
use crate::storage::{MapHandle, WriteSet};
use crate::types::{Record, SelectionCriterion, record_store_name};

use super::{Table, into_values, with_key};

impl Table {
    /// Number of records currently stored.
    pub fn count(&self) -> Result<usize, Error> {
        let schema = self.live_schema()?;
        let records = MapHandle::open_existing(self.backend(), record_store_name(&schema.name))?;
        Ok(records.map_or(0, |r| r.len()))
    }

    /// Insert a new record.
    ///
    /// `values` is a JSON object that must carry a non-null value for the key
    /// field. Non-key fields it omits are stored as null. The record and its
    /// index entries are built and validated in memory first; nothing is
    /// written unless every check passes.
    ///
    /// The key is stored in canonical form: an integral float key such as
    /// `1.0` is stored, and returned by [`get_record`](Table::get_record), as
    /// the integer `1`. Non-key values are stored as given.
    pub fn insert_record(&self, values: Value) -> Result<(), Error> {
        let schema = self.live_schema()?;
        let values = into_values(values)?;

        let key = match values.get(&schema.key_field) {
            Some(v) if !v.is_null() => v,
            _ => return Err(RecordError::MissingKey(schema.key_field.clone()).into()),
        };
        let encoded = encode_key(key)?;

        let backend = self.backend();
        let mut records = RecordStore::open(backend, &schema.name)?;
        if records.contains(&encoded) {
            return Err(RecordError::DuplicateKey(encoded).into());
        }
        if let Some(unknown) = values.keys().find(|f| !schema.has_field(f)) {
            return Err(RecordError::UnknownField(unknown.clone()).into());
        }

        let record: Record = schema
            .value_fields()
            .map(|f| (f.to_string(), values.get(f).cloned().unwrap_or(Value::Null)))
            .collect();
        records.put(&encoded, record.clone());

        let mut writes = WriteSet::new();
        writes.stage(records.into_handle());
        maintain_indexes(backend, &schema, &encoded, None, Some(&record), &mut writes)?;
        writes.commit()?;

        debug!(table = %schema.name, key = %encoded, "record inserted");
        Ok(())
    }

    /// Fetch one record by key, with the key field merged in.
    ///
    /// The merged key is the canonical form of the inserted key, so a record
    /// inserted under `1.0` comes back with `1`; `get_record(1.0)` and
    /// `get_record(1)` find the same record.
    pub fn get_record(&self, key: impl Into<Value>) -> Result<Record, Error> {
        let schema = self.live_schema()?;
        let encoded = encode_key(&key.into())?;
        let records = RecordStore::open(self.backend(), &schema.name)?;
        let record = records
            .get(&encoded)?
            .ok_or_else(|| RecordError::NotFound(encoded.clone()))?;
        with_key(&schema, &encoded, record)
    }

    /// Delete one record by key and drop its index entries.
    pub fn delete_record(&self, key: impl Into<Value>) -> Result<(), Error> {
        let schema = self.live_schema()?;
        let encoded = encode_key(&key.into())?;

        let backend = self.backend();
        let mut records = RecordStore::open(backend, &schema.name)?;
        let old = records
            .remove(&encoded)?
            .ok_or_else(|| RecordError::NotFound(encoded.clone()))?;

        let mut writes = WriteSet::new();
        writes.stage(records.into_handle());
        maintain_indexes(backend, &schema, &encoded, Some(&old), None, &mut writes)?;
        writes.commit()?;

        debug!(table = %schema.name, key = %encoded, "record deleted");
        Ok(())
    }

    /// Overwrite the fields named in `values`; other fields keep their
    /// stored value. The key field cannot be changed.
    pub fn update_record(&self, key: impl Into<Value>, values: Value) -> Result<(), Error> {
        let schema = self.live_schema()?;
        let encoded = encode_key(&key.into())?;
        let values = into_values(values)?;

        let backend = self.backend();
        let mut records = RecordStore::open(backend, &schema.name)?;
        let old = records
            .get(&encoded)?
            .cloned()
            .ok_or_else(|| RecordError::NotFound(encoded.clone()))?;
        if values.contains_key(&schema.key_field) {
            return Err(RecordError::KeyImmutable(schema.key_field.clone()).into());
        }
        if let Some(unknown) = values.keys().find(|f| !schema.has_field(f)) {
            return Err(RecordError::UnknownField(unknown.clone()).into());
        }

        let mut new = old.clone();
        for (field, value) in values {
            new.insert(field, value);
        }
        records.put(&encoded, new.clone());

        let mut writes = WriteSet::new();
        writes.stage(records.into_handle());
        maintain_indexes(backend, &schema, &encoded, Some(&old), Some(&new), &mut writes)?;
        writes.commit()?;

        debug!(table = %schema.name, key = %encoded, "record updated");
        Ok(())
    }

    /// Delete every record matching `criteria` and return how many were
    /// deleted.
    ///
    /// Each record is deleted in its own step; a failure partway leaves the
    /// earlier deletions applied.
    pub fn delete_records(&self, criteria: &[SelectionCriterion]) -> Result<usize, Error> {
        let keys = self.matching_keys(criteria)?;
        for key in &keys {
            self.delete_record(key.clone())?;
        }
        debug!(table = %self.name(), deleted = keys.len(), "records deleted by criteria");
        Ok(keys.len())
    }
}
