#![deny(rust_2018_idioms)]

mod mem;

use std::fmt;

pub use cqlsink_core::{LogicalType, Name, SmolStr};
use itertools::Itertools;
use rustc_hash::FxHashMap;
use thiserror::Error;

pub use self::mem::MemCatalog;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that make a whole batch unprocessable.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} `{ident}` not found")]
    SchemaNotFound { kind: &'static str, ident: String },

    #[error("table `{ident}` has no columns")]
    EmptySchema { ident: String },
}

/// Read access to the database's table metadata.
pub trait Catalog {
    /// Returns the columns of `keyspace.table` in the order the database reports them.
    ///
    /// Fails with [`Error::SchemaNotFound`] if either the keyspace or the table does not exist.
    fn columns(&self, keyspace: &str, table: &str) -> Result<Vec<Column>>;
}

impl<C: Catalog + ?Sized> Catalog for &C {
    #[inline]
    fn columns(&self, keyspace: &str, table: &str) -> Result<Vec<Column>> {
        (**self).columns(keyspace, table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    name: SmolStr,
    key: Name,
    ty: LogicalType,
}

impl Column {
    pub fn new(name: impl Into<SmolStr>, ty: LogicalType) -> Self {
        let name = name.into();
        Self { key: Name::from(&name), name, ty }
    }

    /// The database's canonical spelling of the column name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The lowercased name used for matching record fields.
    #[inline]
    pub fn key(&self) -> &Name {
        &self.key
    }

    #[inline]
    pub fn logical_type(&self) -> &LogicalType {
        &self.ty
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.ty)
    }
}

/// The columns of the target table, loaded fresh for each batch.
#[derive(Debug, Clone)]
pub struct TableSchema {
    keyspace: SmolStr,
    table: SmolStr,
    columns: Box<[Column]>,
    positions: FxHashMap<Name, usize>,
}

impl TableSchema {
    pub fn new(
        keyspace: impl Into<SmolStr>,
        table: impl Into<SmolStr>,
        columns: impl Into<Box<[Column]>>,
    ) -> Self {
        let columns = columns.into();
        let mut positions = FxHashMap::default();
        for (i, column) in columns.iter().enumerate() {
            if positions.contains_key(column.key()) {
                tracing::warn!(
                    column = %column.name(),
                    "column differs from an earlier one only by case, ignoring it for lookup"
                );
                continue;
            }
            positions.insert(column.key().clone(), i);
        }
        Self { keyspace: keyspace.into(), table: table.into(), columns, positions }
    }

    #[inline]
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The position of the column with the given lowercased name.
    #[inline]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&Column> {
        self.position(key).map(|i| &self.columns[i])
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.keyspace, self.table, self.columns.iter().format(", "))
    }
}

/// Loads the authoritative column definitions of `keyspace.table`.
///
/// This must be called once per batch as the table may have changed since the last one.
#[tracing::instrument(skip(catalog))]
pub fn load_schema(catalog: &dyn Catalog, keyspace: &str, table: &str) -> Result<TableSchema> {
    let columns = catalog.columns(keyspace, table)?;
    if columns.is_empty() {
        return Err(Error::EmptySchema { ident: format!("{keyspace}.{table}") });
    }

    for column in &columns {
        tracing::debug!(column = %column.name(), ty = %column.logical_type(), "add column");
    }

    Ok(TableSchema::new(keyspace, table, columns))
}

#[cfg(test)]
mod tests;
