use indexmap::IndexMap;

use crate::{Catalog, Column, Error, Name, Result};

/// An in-memory catalog, keyspace and table names are case insensitive.
#[derive(Debug, Default, Clone)]
pub struct MemCatalog {
    keyspaces: IndexMap<Name, IndexMap<Name, Vec<Column>>>,
}

impl MemCatalog {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_keyspace(&mut self, keyspace: &str) -> &mut Self {
        self.keyspaces.entry(Name::from(keyspace)).or_default();
        self
    }

    /// Creates (or replaces) `keyspace.table`, creating the keyspace if needed.
    pub fn create_table(
        &mut self,
        keyspace: &str,
        table: &str,
        columns: impl IntoIterator<Item = Column>,
    ) -> &mut Self {
        self.keyspaces
            .entry(Name::from(keyspace))
            .or_default()
            .insert(Name::from(table), columns.into_iter().collect());
        self
    }

    /// Appends a column to an existing table.
    pub fn add_column(&mut self, keyspace: &str, table: &str, column: Column) -> Result<()> {
        self.table_mut(keyspace, table)?.push(column);
        Ok(())
    }

    pub fn drop_table(&mut self, keyspace: &str, table: &str) -> Result<()> {
        self.keyspace_mut(keyspace)?
            .shift_remove(Name::from(table).as_str())
            .ok_or_else(|| not_found("table", keyspace, table))?;
        Ok(())
    }

    fn keyspace_mut(&mut self, keyspace: &str) -> Result<&mut IndexMap<Name, Vec<Column>>> {
        self.keyspaces.get_mut(Name::from(keyspace).as_str()).ok_or_else(|| {
            Error::SchemaNotFound { kind: "keyspace", ident: keyspace.to_string() }
        })
    }

    fn table_mut(&mut self, keyspace: &str, table: &str) -> Result<&mut Vec<Column>> {
        self.keyspace_mut(keyspace)?
            .get_mut(Name::from(table).as_str())
            .ok_or_else(|| not_found("table", keyspace, table))
    }
}

fn not_found(kind: &'static str, keyspace: &str, table: &str) -> Error {
    Error::SchemaNotFound { kind, ident: format!("{keyspace}.{table}") }
}

impl Catalog for MemCatalog {
    fn columns(&self, keyspace: &str, table: &str) -> Result<Vec<Column>> {
        let tables = self.keyspaces.get(Name::from(keyspace).as_str()).ok_or_else(|| {
            Error::SchemaNotFound { kind: "keyspace", ident: keyspace.to_string() }
        })?;
        tables
            .get(Name::from(table).as_str())
            .cloned()
            .ok_or_else(|| not_found("table", keyspace, table))
    }
}
