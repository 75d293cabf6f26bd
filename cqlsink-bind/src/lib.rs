#![deny(rust_2018_idioms)]

mod binder;
mod normalize;
mod stmt;

pub use cqlsink_catalog::{Column, TableSchema};
use cqlsink_core::{FieldType, LogicalType};
use thiserror::Error;

pub use self::binder::{Binder, TIMESTAMP_FORMAT};
pub use self::normalize::{CanonicalRecord, Entry, TypeHint};
pub use self::stmt::{BoundStatement, InsertTemplate, PreparedStatement};

/// Errors that reject a single record. The rest of the batch is unaffected.
#[derive(Debug, Error)]
pub enum Error {
    #[error("column name `{field}` with different capitalization already present as `{existing}`")]
    DuplicateColumnCapitalization { field: String, existing: String },

    #[error("record fields {fields:?} are not columns of table `{table}`")]
    UnknownColumn { table: String, fields: Vec<String> },

    #[error("invalid record shape: expected {expected}, found {found}")]
    InvalidRecordShape { expected: &'static str, found: String },

    #[error("value of type {found} cannot be bound to column `{column}` of type {expected}")]
    TypeMismatch { column: String, expected: String, found: String },

    #[error(
        "invalid timestamp format for `{value}` in column `{column}`, expected 'yyyy-mm-dd hh:mm:ss'"
    )]
    TimestampFormat { column: String, value: String },

    #[error("timestamp {millis}ms in column `{column}` is out of range")]
    TimestampOutOfRange { column: String, millis: i64 },

    #[error("column type {ty} for `{column}` not supported yet")]
    UnsupportedColumnType { column: String, ty: LogicalType },

    #[error("schema type {ty} for `{field}` not supported yet")]
    UnsupportedFieldType { field: String, ty: FieldType },

    #[error("statement `{query}` was not prepared for the columns of table `{table}`")]
    StatementMismatch { table: String, query: String },

    #[error("statement has no bind marker named `{name}`")]
    UnknownParameter { name: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
