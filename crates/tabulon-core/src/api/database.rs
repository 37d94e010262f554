use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::catalog;
use crate::config::DatabaseConfig;
use crate::error::{Error, SchemaError};
use crate::record::RecordStore;
use crate::storage::{FileBackend, MapHandle, MemoryBackend, StoreBackend};
use crate::table::Table;
use crate::types::{CATALOG_STORE, Field, TableSchema, index_store_name, record_store_name};

struct DatabaseInner {
    backend: Arc<dyn StoreBackend>,
    /// Serializes read-modify-write cycles on the catalog store. Shared with
    /// every table handle.
    catalog_lock: Arc<Mutex<()>>,
    tables: RwLock<HashMap<String, Table>>,
}

/// The database handle: the catalog of tables and their lifecycle.
///
/// `Database` is cheaply clonable (`Arc`-based) and `Send + Sync`. There is
/// no process-wide registry; each handle owns the tables of its own backend.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Open (or create) an on-disk database described by `config`.
    ///
    /// Every catalogued table is rehydrated before this returns.
    pub fn open(config: &DatabaseConfig) -> Result<Self, Error> {
        let backend = FileBackend::open(config)?;
        Self::with_backend(Arc::new(backend))
    }

    /// Open (or create) an on-disk database under `root` with default
    /// settings.
    pub fn create_in(root: impl AsRef<Path>) -> Result<Self, Error> {
        Self::open(&DatabaseConfig::new(root))
    }

    /// Open the on-disk database named by the environment: `TABULON_ROOT`
    /// (default `db_files`) and `TABULON_SYNC`.
    pub fn open_from_env() -> Result<Self, Error> {
        Self::open(&DatabaseConfig::from_env())
    }

    /// A throwaway database kept entirely in memory.
    pub fn in_memory() -> Self {
        Self::from_parts(Arc::new(MemoryBackend::new()), HashMap::new())
    }

    /// Open a database over any store backend, rehydrating its catalog.
    pub fn with_backend(backend: Arc<dyn StoreBackend>) -> Result<Self, Error> {
        let catalog_lock = Arc::new(Mutex::new(()));
        let mut tables = HashMap::new();
        if let Some(handle) = MapHandle::open_existing(backend.as_ref(), CATALOG_STORE)? {
            for entry in catalog::ops::load_all(&handle)? {
                let name = entry.schema.name.clone();
                let table = Table::new(backend.clone(), catalog_lock.clone(), entry.schema);
                tables.insert(name, table);
            }
        }
        info!(tables = tables.len(), "database opened");
        Ok(Self {
            inner: Arc::new(DatabaseInner {
                backend,
                catalog_lock,
                tables: RwLock::new(tables),
            }),
        })
    }

    fn from_parts(backend: Arc<dyn StoreBackend>, tables: HashMap<String, Table>) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                backend,
                catalog_lock: Arc::new(Mutex::new(())),
                tables: RwLock::new(tables),
            }),
        }
    }

    /// Create a table with the given fields and primary key.
    ///
    /// Persists an empty record store and the catalog entry (no fields
    /// indexed), then returns a live handle.
    pub fn create_table(
        &self,
        name: &str,
        fields: Vec<Field>,
        key_field: &str,
    ) -> Result<Table, Error> {
        let schema = TableSchema::new(name, fields, key_field)?;

        let mut tables = self.inner.tables.write();
        if tables.contains_key(name) {
            return Err(SchemaError::TableAlreadyExists(name.to_string()).into());
        }

        let backend = self.inner.backend.as_ref();
        let _guard = self.inner.catalog_lock.lock();
        let mut handle = MapHandle::open(backend, CATALOG_STORE)?;
        let entry = catalog::ops::create_table(&mut handle, schema)?;

        // Records before catalog: a crash in between leaves only an
        // uncatalogued store, which the next create overwrites.
        RecordStore::create(backend, name).commit()?;
        handle.commit()?;

        let table = Table::new(
            self.inner.backend.clone(),
            self.inner.catalog_lock.clone(),
            entry.schema,
        );
        tables.insert(name.to_string(), table.clone());
        info!(table = name, key = key_field, "table created");
        Ok(table)
    }

    /// Get a handle to an existing table.
    pub fn get_table(&self, name: &str) -> Result<Table, Error> {
        self.inner
            .tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::TableNotFound(name.to_string()).into())
    }

    /// Delete a table with its records and indexes.
    ///
    /// Outstanding handles to the table fail with `NotFound` afterwards.
    pub fn delete_table(&self, name: &str) -> Result<(), Error> {
        let mut tables = self.inner.tables.write();
        let table = tables
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::TableNotFound(name.to_string()))?;

        let backend = self.inner.backend.as_ref();
        let entry = {
            let _guard = self.inner.catalog_lock.lock();
            let mut handle = MapHandle::open(backend, CATALOG_STORE)?;
            let entry = catalog::ops::drop_table(&mut handle, name)?;
            handle.commit()?;
            entry
        };

        backend.remove(&record_store_name(name))?;
        // Every value field, not only flagged ones, so a stale index left by
        // an interrupted create_index goes too.
        for field in entry.schema.value_fields() {
            if backend.remove(&index_store_name(name, field))? {
                debug!(table = name, field, "index store removed");
            }
        }

        table.mark_dropped();
        tables.remove(name);
        info!(table = name, "table deleted");
        Ok(())
    }

    /// Number of live tables.
    pub fn num_tables(&self) -> usize {
        self.inner.tables.read().len()
    }

    /// Names of all live tables, sorted.
    pub fn get_table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Current schema of a table, including index flags.
    pub fn describe_table(&self, name: &str) -> Result<TableSchema, Error> {
        Ok(self.get_table(name)?.schema())
    }

    /// The store backend this database runs on.
    pub fn backend(&self) -> &dyn StoreBackend {
        self.inner.backend.as_ref()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.inner.backend)
            .field("tables", &self.get_table_names())
            .finish()
    }
}
