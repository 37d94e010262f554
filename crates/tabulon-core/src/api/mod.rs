//! Public API: the database handle and re-exports of the table surface.

pub mod database;

pub use crate::table::{AccessPath, Table};
pub use crate::types::{Field, FieldType, Operator, Record, SelectionCriterion, TableSchema};
pub use database::Database;
