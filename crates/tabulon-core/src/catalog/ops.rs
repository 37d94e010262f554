//! Catalog operations: create, drop, get and load tables, flag indexes.
//!
//! The catalog is a single store keyed by table name whose values are
//! JSON-serialized `CatalogEntry` objects. Every function works on an open
//! catalog handle; the caller commits it.

use serde_json::Value;

use crate::error::{Error, SchemaError, StorageError};
use crate::storage::MapHandle;
use crate::types::{CATALOG_STORE, TableSchema};

use super::CatalogEntry;

/// Register a new table.
///
/// Fails with `TableAlreadyExists` if the name is taken.
pub fn create_table(catalog: &mut MapHandle<'_>, schema: TableSchema) -> Result<CatalogEntry, Error> {
    if catalog.contains_key(&schema.name) {
        return Err(SchemaError::TableAlreadyExists(schema.name).into());
    }
    let entry = CatalogEntry { schema };
    catalog.put(entry.schema.name.clone(), encode_entry(&entry)?);
    Ok(entry)
}

/// Remove a table's entry and return it.
pub fn drop_table(catalog: &mut MapHandle<'_>, table_name: &str) -> Result<CatalogEntry, Error> {
    let value = catalog
        .delete(table_name)
        .ok_or_else(|| SchemaError::TableNotFound(table_name.to_string()))?;
    decode_entry(table_name, &value)
}

/// Look up a table's entry by name.
pub fn get_table(catalog: &MapHandle<'_>, table_name: &str) -> Result<CatalogEntry, Error> {
    let value = catalog
        .get(table_name)
        .ok_or_else(|| SchemaError::TableNotFound(table_name.to_string()))?;
    decode_entry(table_name, value)
}

/// Every entry in the catalog, sorted by table name.
pub fn load_all(catalog: &MapHandle<'_>) -> Result<Vec<CatalogEntry>, Error> {
    catalog
        .iter()
        .map(|(name, value)| decode_entry(name, value))
        .collect()
}

/// Set the index flag of `field` in a table's entry.
///
/// The key field is never flagged. Returns the updated entry.
pub fn set_index_flag(
    catalog: &mut MapHandle<'_>,
    table_name: &str,
    field: &str,
) -> Result<CatalogEntry, Error> {
    let mut entry = get_table(catalog, table_name)?;
    if !entry.schema.has_field(field) {
        return Err(SchemaError::FieldNotInSchema {
            table: table_name.to_string(),
            field: field.to_string(),
        }
        .into());
    }
    entry.schema.set_indexed(field);
    catalog.put(table_name, encode_entry(&entry)?);
    Ok(entry)
}

fn encode_entry(entry: &CatalogEntry) -> Result<Value, Error> {
    serde_json::to_value(entry).map_err(|e| {
        StorageError::Corrupted {
            store: CATALOG_STORE.to_string(),
            reason: format!("failed to serialize catalog entry: {e}"),
        }
        .into()
    })
}

fn decode_entry(table_name: &str, value: &Value) -> Result<CatalogEntry, Error> {
    let entry: CatalogEntry = serde_json::from_value(value.clone()).map_err(|e| {
        StorageError::Corrupted {
            store: CATALOG_STORE.to_string(),
            reason: format!("failed to deserialize catalog entry '{table_name}': {e}"),
        }
    })?;
    if entry.schema.name != table_name {
        return Err(StorageError::Corrupted {
            store: CATALOG_STORE.to_string(),
            reason: format!(
                "entry '{table_name}' describes table '{}'",
                entry.schema.name
            ),
        }
        .into());
    }
    Ok(entry)
}
