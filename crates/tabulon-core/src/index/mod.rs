//! Hash index stores: per indexed field, a mapping from encoded field value
//! to the bucket of encoded primary keys holding that value.
//!
//! Null values are never indexed. A bucket that becomes empty is removed, so
//! an absent bucket and "no records with that value" are the same thing.

use serde_json::Value;
use tracing::debug;

use crate::encoding::encode_value;
use crate::error::{Error, SchemaError, StorageError};
use crate::record::RecordStore;
use crate::storage::{MapHandle, StoreBackend, WriteSet};
use crate::types::{Record, TableSchema, index_store_name};

/// One scoped acquisition of the hash index on a single field.
#[derive(Debug)]
pub struct HashIndex<'a> {
    handle: MapHandle<'a>,
}

impl<'a> HashIndex<'a> {
    /// Open the index on `field` of `table`, empty if it was never written.
    pub fn open(
        backend: &'a dyn StoreBackend,
        table: &str,
        field: &str,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            handle: MapHandle::open(backend, index_store_name(table, field))?,
        })
    }

    /// Start an empty index, replacing any existing one on commit.
    pub fn create(backend: &'a dyn StoreBackend, table: &str, field: &str) -> Self {
        Self {
            handle: MapHandle::create(backend, index_store_name(table, field)),
        }
    }

    /// Encoded primary keys whose record holds `value`. Empty if none.
    pub fn bucket(&self, value: &Value) -> Result<Vec<String>, Error> {
        if value.is_null() {
            return Ok(Vec::new());
        }
        let slot = encode_value(value)?;
        match self.handle.get(&slot) {
            None => Ok(Vec::new()),
            Some(bucket) => Ok(bucket_keys(self.handle.name(), &slot, bucket)?),
        }
    }

    /// Add `key` to the bucket for `value`, creating the bucket if absent.
    /// Null values and keys already present are ignored.
    pub fn add(&mut self, value: &Value, key: &str) -> Result<(), Error> {
        if value.is_null() {
            return Ok(());
        }
        let slot = encode_value(value)?;
        let name = self.handle.name().to_string();
        match self.handle.get_mut(&slot) {
            Some(Value::Array(keys)) => {
                if !keys.iter().any(|k| k.as_str() == Some(key)) {
                    keys.push(Value::String(key.to_string()));
                }
            }
            Some(_) => return Err(not_a_bucket(&name, &slot).into()),
            None => {
                self.handle
                    .put(slot, Value::Array(vec![Value::String(key.to_string())]));
            }
        }
        Ok(())
    }

    /// Remove `key` from the bucket for `value`, dropping the bucket once
    /// empty.
    pub fn remove(&mut self, value: &Value, key: &str) -> Result<(), Error> {
        if value.is_null() {
            return Ok(());
        }
        let slot = encode_value(value)?;
        let name = self.handle.name().to_string();
        let now_empty = match self.handle.get_mut(&slot) {
            Some(Value::Array(keys)) => {
                keys.retain(|k| k.as_str() != Some(key));
                keys.is_empty()
            }
            Some(_) => return Err(not_a_bucket(&name, &slot).into()),
            None => false,
        };
        if now_empty {
            self.handle.delete(&slot);
        }
        Ok(())
    }

    /// Number of distinct indexed values.
    pub fn value_count(&self) -> usize {
        self.handle.len()
    }

    pub fn into_handle(self) -> MapHandle<'a> {
        self.handle
    }

    pub fn commit(self) -> Result<(), StorageError> {
        self.handle.commit()
    }
}

/// Build a fresh index on `field` from a full scan of `records`.
///
/// Every stored record must carry a slot for `field`; a record without one
/// is a schema fault.
pub fn build_index<'a>(
    backend: &'a dyn StoreBackend,
    schema: &TableSchema,
    field: &str,
    records: &RecordStore<'_>,
) -> Result<HashIndex<'a>, Error> {
    let mut index = HashIndex::create(backend, &schema.name, field);
    for entry in records.scan() {
        let (key, record) = entry?;
        let value = record.get(field).ok_or_else(|| SchemaError::RowMissingField {
            table: schema.name.clone(),
            field: field.to_string(),
            key: key.to_string(),
        })?;
        index.add(value, key)?;
    }
    Ok(index)
}

/// Stage index updates for a record mutation.
///
/// `old` is the record before the mutation (`None` for an insert) and `new`
/// the record after it (`None` for a delete). For every indexed field whose
/// value changed, `key` moves from the old value's bucket to the new one's.
/// Touched indexes are staged into `writes`; untouched ones are not opened.
pub fn maintain_indexes<'a>(
    backend: &'a dyn StoreBackend,
    schema: &TableSchema,
    key: &str,
    old: Option<&Record>,
    new: Option<&Record>,
    writes: &mut WriteSet<'a>,
) -> Result<(), Error> {
    for field in schema.indexed_fields() {
        let old_value = old.and_then(|r| r.get(field)).unwrap_or(&Value::Null);
        let new_value = new.and_then(|r| r.get(field)).unwrap_or(&Value::Null);
        if old_value.is_null() && new_value.is_null() {
            continue;
        }
        if encode_value(old_value)? == encode_value(new_value)? {
            continue;
        }

        let mut index = HashIndex::open(backend, &schema.name, field)?;
        index.remove(old_value, key)?;
        index.add(new_value, key)?;
        debug!(table = %schema.name, field, key, "index entry moved");
        writes.stage(index.into_handle());
    }
    Ok(())
}

fn bucket_keys(store: &str, slot: &str, bucket: &Value) -> Result<Vec<String>, StorageError> {
    let keys = bucket.as_array().ok_or_else(|| not_a_bucket(store, slot))?;
    keys.iter()
        .map(|k| {
            k.as_str()
                .map(str::to_string)
                .ok_or_else(|| not_a_bucket(store, slot))
        })
        .collect()
}

fn not_a_bucket(store: &str, slot: &str) -> StorageError {
    StorageError::Corrupted {
        store: store.to_string(),
        reason: format!("bucket {slot} is not a list of keys"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use crate::types::{Field, FieldType};
    use serde_json::json;

    fn schema_with_index() -> TableSchema {
        let mut schema = TableSchema::new(
            "Students",
            vec![
                Field::new("ID", FieldType::Int),
                Field::new("First", FieldType::Str),
                Field::new("Birthday", FieldType::Str),
            ],
            "ID",
        )
        .unwrap();
        schema.set_indexed("Birthday");
        schema
    }

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_add_remove_bucket() {
        let backend = MemoryBackend::new();
        let mut index = HashIndex::open(&backend, "Students", "Birthday").unwrap();
        index.add(&json!("ry"), "1").unwrap();
        index.add(&json!("ry"), "2").unwrap();
        index.add(&json!("ry"), "2").unwrap();
        index.add(&Value::Null, "3").unwrap();
        assert_eq!(index.bucket(&json!("ry")).unwrap(), vec!["1", "2"]);
        assert!(index.bucket(&Value::Null).unwrap().is_empty());

        index.remove(&json!("ry"), "1").unwrap();
        index.remove(&json!("ry"), "2").unwrap();
        assert!(index.bucket(&json!("ry")).unwrap().is_empty());
        assert_eq!(index.value_count(), 0);

        // Removing from an absent bucket is harmless.
        index.remove(&json!("nope"), "9").unwrap();
    }

    #[test]
    fn test_numeric_values_share_bucket() {
        let backend = MemoryBackend::new();
        let mut index = HashIndex::open(&backend, "T", "n").unwrap();
        index.add(&json!(2), "\"a\"").unwrap();
        index.add(&json!(2.0), "\"b\"").unwrap();
        assert_eq!(index.bucket(&json!(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_build_index_skips_nulls() {
        let backend = MemoryBackend::new();
        let schema = schema_with_index();
        let mut records = RecordStore::open(&backend, "Students").unwrap();
        records.put("1", record(json!({"First": "a", "Birthday": "x"})));
        records.put("2", record(json!({"First": "b", "Birthday": null})));
        records.put("3", record(json!({"First": "c", "Birthday": "x"})));

        let index = build_index(&backend, &schema, "Birthday", &records).unwrap();
        assert_eq!(index.bucket(&json!("x")).unwrap(), vec!["1", "3"]);
        assert_eq!(index.value_count(), 1);
    }

    #[test]
    fn test_build_index_missing_slot() {
        let backend = MemoryBackend::new();
        let schema = schema_with_index();
        let mut records = RecordStore::open(&backend, "Students").unwrap();
        records.put("1", record(json!({"First": "a"})));

        let err = build_index(&backend, &schema, "Birthday", &records).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema(SchemaError::RowMissingField { .. })
        ));
    }

    #[test]
    fn test_maintain_indexes_moves_key() {
        let backend = MemoryBackend::new();
        let schema = schema_with_index();
        let before = record(json!({"First": "a", "Birthday": "ry"}));
        let after = record(json!({"First": "a", "Birthday": "gggggg"}));

        let mut writes = WriteSet::new();
        maintain_indexes(&backend, &schema, "1", None, Some(&before), &mut writes).unwrap();
        writes.commit().unwrap();

        let mut writes = WriteSet::new();
        maintain_indexes(&backend, &schema, "1", Some(&before), Some(&after), &mut writes)
            .unwrap();
        writes.commit().unwrap();

        let index = HashIndex::open(&backend, "Students", "Birthday").unwrap();
        assert!(index.bucket(&json!("ry")).unwrap().is_empty());
        assert_eq!(index.bucket(&json!("gggggg")).unwrap(), vec!["1"]);
    }

    #[test]
    fn test_maintain_indexes_unchanged_value_stages_nothing() {
        let backend = MemoryBackend::new();
        let schema = schema_with_index();
        let rec = record(json!({"First": "a", "Birthday": "ry"}));
        let renamed = record(json!({"First": "b", "Birthday": "ry"}));

        let mut writes = WriteSet::new();
        maintain_indexes(&backend, &schema, "1", Some(&rec), Some(&renamed), &mut writes)
            .unwrap();
        assert!(writes.is_empty());
    }

    #[test]
    fn test_maintain_indexes_delete() {
        let backend = MemoryBackend::new();
        let schema = schema_with_index();
        let rec = record(json!({"First": "a", "Birthday": "h"}));

        let mut writes = WriteSet::new();
        maintain_indexes(&backend, &schema, "1", None, Some(&rec), &mut writes).unwrap();
        writes.commit().unwrap();
        let mut writes = WriteSet::new();
        maintain_indexes(&backend, &schema, "1", Some(&rec), None, &mut writes).unwrap();
        writes.commit().unwrap();

        let index = HashIndex::open(&backend, "Students", "Birthday").unwrap();
        assert_eq!(index.value_count(), 0);
    }
}
