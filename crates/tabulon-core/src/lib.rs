//! # Tabulon
//!
//! A small embedded table store: named tables with a fixed field list and a
//! primary key, point CRUD, conjunctive queries, and optional hash indexes
//! on non-key fields. Every table, index and the catalog itself is kept in a
//! persistent named map, so a reopened database comes back with all of its
//! tables and index flags.
//!
//! ## Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use tabulon_core::api::{Database, Field, FieldType, Operator, SelectionCriterion};
//!
//! let db = Database::create_in("db_files").unwrap();
//! let students = db
//!     .create_table(
//!         "Students",
//!         vec![
//!             Field::new("ID", FieldType::Int),
//!             Field::new("First", FieldType::Str),
//!             Field::new("Birthday", FieldType::Str),
//!         ],
//!         "ID",
//!     )
//!     .unwrap();
//!
//! students
//!     .insert_record(json!({"ID": 1000001, "First": "John", "Birthday": "23/11/2000"}))
//!     .unwrap();
//! students.create_index("Birthday").unwrap();
//!
//! let rows = students
//!     .query_table(&[SelectionCriterion::new("Birthday", Operator::Eq, "23/11/2000")])
//!     .unwrap();
//! assert_eq!(rows[0]["First"], "John");
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod encoding;
pub mod error;
pub mod filter;
pub mod index;
pub mod record;
pub mod storage;
pub mod table;
pub mod types;

pub use api::Database;
pub use config::DatabaseConfig;
pub use error::{Error, ErrorKind, Result};
