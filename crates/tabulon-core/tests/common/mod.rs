#![allow(dead_code)]

use serde_json::json;
use tabulon_core::api::{Database, Field, FieldType, Table};
use tabulon_core::config::{DatabaseConfig, SyncMode};

/// Install a fmt subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Open an on-disk database under `root` without fsync.
pub fn open_db(root: &std::path::Path) -> Database {
    init_tracing();
    Database::open(&DatabaseConfig::new(root).with_sync_mode(SyncMode::None)).unwrap()
}

pub fn student_fields() -> Vec<Field> {
    vec![
        Field::new("ID", FieldType::Int),
        Field::new("First", FieldType::Str),
        Field::new("Last", FieldType::Str),
        Field::new("Birthday", FieldType::Str),
    ]
}

pub fn create_students(db: &Database) -> Table {
    db.create_table("Students", student_fields(), "ID").unwrap()
}

pub fn add_student(table: &Table, index: i64, birthday: &str) {
    table
        .insert_record(json!({
            "ID": 1_000_000 + index,
            "First": format!("John{index}"),
            "Last": format!("Doe{index}"),
            "Birthday": birthday,
        }))
        .unwrap();
}

/// Sort records by their `ID` for order-insensitive comparison.
pub fn sorted(mut rows: Vec<tabulon_core::api::Record>) -> Vec<tabulon_core::api::Record> {
    rows.sort_by_key(|r| r["ID"].as_i64());
    rows
}
