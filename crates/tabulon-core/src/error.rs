//! Error types for all Tabulon operations.

use std::io;
use thiserror::Error;

/// Top-level error type for Tabulon operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Coarse classification of an [`Error`], stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingKey,
    DuplicateKey,
    NotFound,
    UnknownField,
    KeyImmutable,
    DuplicateTable,
    Schema,
    UnsupportedOperator,
    Storage,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Storage(_) => ErrorKind::Storage,
            Error::Encoding(EncodingError::Serialization(_)) => ErrorKind::Storage,
            Error::Encoding(EncodingError::UnsupportedKey { .. }) => ErrorKind::Schema,
            Error::Schema(SchemaError::TableNotFound(_)) => ErrorKind::NotFound,
            Error::Schema(SchemaError::TableAlreadyExists(_)) => ErrorKind::DuplicateTable,
            Error::Schema(_) => ErrorKind::Schema,
            Error::Record(RecordError::MissingKey(_)) => ErrorKind::MissingKey,
            Error::Record(RecordError::DuplicateKey(_)) => ErrorKind::DuplicateKey,
            Error::Record(RecordError::NotFound(_)) => ErrorKind::NotFound,
            Error::Record(RecordError::UnknownField(_)) => ErrorKind::UnknownField,
            Error::Record(RecordError::KeyImmutable(_)) => ErrorKind::KeyImmutable,
            Error::Query(QueryError::UnsupportedOperator(_)) => ErrorKind::UnsupportedOperator,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupted store '{store}': {reason}")]
    Corrupted { store: String, reason: String },

    #[error("invalid magic bytes in store '{0}'")]
    InvalidMagic(String),

    #[error("unsupported store format version: {0}")]
    UnsupportedVersion(u32),

    #[error("database directory is locked by another process")]
    Locked,
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("key values must be strings, numbers or booleans (got {kind})")]
    UnsupportedKey { kind: &'static str },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("table already exists: {0}")]
    TableAlreadyExists(String),

    #[error("key field '{key}' is not one of the fields of table '{table}'")]
    KeyFieldNotInSchema { table: String, key: String },

    #[error("field '{field}' is not part of table '{table}'")]
    FieldNotInSchema { table: String, field: String },

    #[error("stored record {key} in table '{table}' has no value slot for field '{field}'")]
    RowMissingField {
        table: String,
        field: String,
        key: String,
    },

    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    #[error("a table needs at least one field")]
    NoFields,

    #[error("record values must be a JSON object (got {0})")]
    NotAnObject(&'static str),

    #[error("invalid name '{0}': names must be non-empty and free of '.', '/', '\\' and NUL")]
    InvalidName(String),
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record has no value for key field '{0}'")]
    MissingKey(String),

    #[error("a record with key {0} already exists")]
    DuplicateKey(String),

    #[error("no record with key {0}")]
    NotFound(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("key field '{0}' cannot be updated")]
    KeyImmutable(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unsupported comparison operator: {0:?}")]
    UnsupportedOperator(String),
}

pub type Result<T> = std::result::Result<T, Error>;
