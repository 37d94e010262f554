use tracing::{debug, info};

use crate::catalog;
use crate::error::{Error, SchemaError};
use crate::index::build_index;
use crate::record::RecordStore;
use crate::storage::MapHandle;
use crate::types::CATALOG_STORE;

use super::Table;

impl Table {
    /// Build a hash index on `field` and maintain it from now on.
    ///
    /// A no-op for the key field and for fields already indexed. The index is
    /// built from a full scan of the current records (nulls skipped), then
    /// the field's index flag is persisted in the catalog.
    pub fn create_index(&self, field: &str) -> Result<(), Error> {
        let mut schema = self.inner.schema.write();
        if self.is_dropped() {
            return Err(SchemaError::TableNotFound(schema.name.clone()).into());
        }
        if schema.is_key(field) {
            debug!(table = %schema.name, field, "key field is implicitly indexed");
            return Ok(());
        }
        if !schema.has_field(field) {
            return Err(SchemaError::FieldNotInSchema {
                table: schema.name.clone(),
                field: field.to_string(),
            }
            .into());
        }
        if schema.is_indexed(field) {
            return Ok(());
        }

        let backend = self.backend();
        let records = RecordStore::open(backend, &schema.name)?;
        let index = build_index(backend, &schema, field, &records)?;
        let values = index.value_count();
        drop(records);
        index.commit()?;

        {
            let _guard = self.inner.catalog_lock.lock();
            let mut handle = MapHandle::open(backend, CATALOG_STORE)?;
            catalog::ops::set_index_flag(&mut handle, &schema.name, field)?;
            handle.commit()?;
        }
        schema.set_indexed(field);

        info!(table = %schema.name, field, values, "index created");
        Ok(())
    }
}
