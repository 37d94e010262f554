//! Table catalog: schema storage, create/drop/list operations.

pub mod ops;

use serde::{Deserialize, Serialize};

use crate::types::TableSchema;

/// A catalog entry storing one live table's schema, including its index
/// flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub schema: TableSchema,
}
