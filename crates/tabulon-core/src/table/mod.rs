//! Table handles: CRUD, the query engine and secondary index lifecycle.
//!
//! A [`Table`] is a cheap `Arc` clone. Every clone of one table shares a
//! single in-memory schema, so an index created through one handle is
//! maintained by all of them. Handles hold no open stores between calls:
//! each operation acquires the stores it touches and releases them before
//! returning.

mod crud;
mod index;
mod query;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde_json::{Map, Value};

use crate::encoding::decode_key;
use crate::error::{Error, SchemaError};
use crate::storage::StoreBackend;
use crate::types::{Record, SelectionCriterion, TableSchema};

pub use query::AccessPath;

struct TableInner {
    backend: Arc<dyn StoreBackend>,
    /// Serializes read-modify-write cycles on the catalog store.
    catalog_lock: Arc<Mutex<()>>,
    schema: RwLock<TableSchema>,
    dropped: AtomicBool,
}

/// A handle to one table.
#[derive(Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

impl Table {
    pub(crate) fn new(
        backend: Arc<dyn StoreBackend>,
        catalog_lock: Arc<Mutex<()>>,
        schema: TableSchema,
    ) -> Self {
        Self {
            inner: Arc::new(TableInner {
                backend,
                catalog_lock,
                schema: RwLock::new(schema),
                dropped: AtomicBool::new(false),
            }),
        }
    }

    /// Table name.
    pub fn name(&self) -> String {
        self.inner.schema.read().name.clone()
    }

    /// Snapshot of the current schema, including index flags.
    pub fn schema(&self) -> TableSchema {
        self.inner.schema.read().clone()
    }

    /// Name of the primary key field.
    pub fn key_field(&self) -> String {
        self.inner.schema.read().key_field.clone()
    }

    /// Whether `field` has a hash index.
    pub fn is_indexed(&self, field: &str) -> bool {
        self.inner.schema.read().is_indexed(field)
    }

    /// Whether the table has been deleted from its database.
    pub fn is_dropped(&self) -> bool {
        self.inner.dropped.load(Ordering::Acquire)
    }

    pub(crate) fn mark_dropped(&self) {
        self.inner.dropped.store(true, Ordering::Release);
    }

    fn backend(&self) -> &dyn StoreBackend {
        self.inner.backend.as_ref()
    }

    /// Read access to the schema for the length of one operation; fails once
    /// the table is dropped.
    ///
    /// Holding the guard excludes `create_index`, so a mutation either runs
    /// entirely before an index build or sees the new index flag. The guard
    /// is not reentrant: never call another public method while holding it.
    fn live_schema(&self) -> Result<RwLockReadGuard<'_, TableSchema>, Error> {
        let schema = self.inner.schema.read();
        if self.is_dropped() {
            return Err(SchemaError::TableNotFound(schema.name.clone()).into());
        }
        Ok(schema)
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let schema = self.inner.schema.read();
        f.debug_struct("Table")
            .field("name", &schema.name)
            .field("key_field", &schema.key_field)
            .field("dropped", &self.is_dropped())
            .finish()
    }
}

/// Take the object out of a caller-supplied value map.
fn into_values(values: Value) -> Result<Map<String, Value>, Error> {
    match values {
        Value::Object(map) => Ok(map),
        Value::Null => Err(SchemaError::NotAnObject("null").into()),
        Value::Bool(_) => Err(SchemaError::NotAnObject("bool").into()),
        Value::Number(_) => Err(SchemaError::NotAnObject("number").into()),
        Value::String(_) => Err(SchemaError::NotAnObject("string").into()),
        Value::Array(_) => Err(SchemaError::NotAnObject("array").into()),
    }
}

/// A stored record with its key field merged back in.
fn with_key(schema: &TableSchema, encoded_key: &str, record: &Record) -> Result<Record, Error> {
    let mut out = record.clone();
    out.insert(schema.key_field.clone(), decode_key(encoded_key)?);
    Ok(out)
}

/// Fail if any criterion names a field outside the schema.
fn check_criteria(schema: &TableSchema, criteria: &[SelectionCriterion]) -> Result<(), Error> {
    if let Some(c) = criteria.iter().find(|c| !schema.has_field(&c.field_name)) {
        return Err(SchemaError::FieldNotInSchema {
            table: schema.name.clone(),
            field: c.field_name.clone(),
        }
        .into());
    }
    Ok(())
}
