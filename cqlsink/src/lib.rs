#![deny(rust_2018_idioms)]

mod config;
mod processor;
mod record;
mod session;
mod task;

pub use cqlsink_bind::{BoundStatement, InsertTemplate, PreparedStatement};
pub use cqlsink_catalog::{Catalog, Column, MemCatalog, TableSchema};
pub use cqlsink_core::{Datum, Field, FieldType, LogicalType, Schema, Struct, Value};
use thiserror::Error;

pub use self::config::{ContactPoint, SinkConfig, CONTACT_POINTS, KEYSPACE, TABLE};
pub use self::processor::{BatchOutput, BatchProcessor, Rejected};
pub use self::record::SinkRecord;
pub use self::session::{MemSession, Session};
pub use self::task::{SinkTask, VERSION};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("sink task has not been started")]
    NotStarted,
    #[error(transparent)]
    Catalog(#[from] cqlsink_catalog::Error),
    #[error(transparent)]
    Bind(#[from] cqlsink_bind::Error),
    #[error(transparent)]
    Session(#[from] anyhow::Error),
}
