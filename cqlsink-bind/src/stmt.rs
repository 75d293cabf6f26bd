use std::fmt;
use std::sync::Arc;

use cqlsink_catalog::{Column, TableSchema};
use cqlsink_core::{Name, SmolStr, Value};
use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::{Error, Result};

/// A parameterized `INSERT` naming every column of the target table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTemplate {
    keyspace: SmolStr,
    table: SmolStr,
    columns: Box<[Column]>,
    query: String,
}

impl InsertTemplate {
    /// Builds `INSERT INTO ks.table (c1, ..) VALUES (:c1, ..)` with one named bind marker per
    /// column, in schema order.
    pub fn build(schema: &TableSchema) -> cqlsink_catalog::Result<Self> {
        if schema.is_empty() {
            return Err(cqlsink_catalog::Error::EmptySchema {
                ident: format!("{}.{}", schema.keyspace(), schema.table()),
            });
        }

        let columns = schema.columns();
        let query = format!(
            "INSERT INTO {}.{} ({}) VALUES ({})",
            schema.keyspace(),
            schema.table(),
            columns.iter().map(|c| Ident(c.name())).format(", "),
            columns.iter().map(|c| format!(":{}", Ident(c.name()))).format(", "),
        );

        Ok(Self {
            keyspace: schema.keyspace().into(),
            table: schema.table().into(),
            columns: columns.into(),
            query,
        })
    }

    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[inline]
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl fmt::Display for InsertTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

/// Renders a column name as a CQL identifier, quoting it unless it is a plain lowercase one.
struct Ident<'a>(&'a str);

/// Keywords that cannot appear as unquoted identifiers. Sorted for binary search.
const RESERVED: &[&str] = &[
    "add", "allow", "alter", "and", "apply", "asc", "authorize", "batch", "begin", "by",
    "columnfamily", "create", "delete", "desc", "describe", "drop", "entries", "execute", "from",
    "full", "grant", "if", "in", "index", "infinity", "insert", "into", "is", "keyspace", "limit",
    "materialized", "mbean", "mbeans", "modify", "nan", "norecursive", "not", "null", "of", "on",
    "or", "order", "primary", "rename", "replace", "revoke", "schema", "select", "set", "table",
    "to", "token", "truncate", "unlogged", "unset", "update", "use", "using", "view", "where",
    "with",
];

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = self.0.chars();
        let plain = chars.next().is_some_and(|c| c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            && RESERVED.binary_search(&self.0).is_err();
        if plain { f.write_str(self.0) } else { write!(f, "\"{}\"", self.0.replace('"', "\"\"")) }
    }
}

/// An [`InsertTemplate`] that has been prepared by a session.
#[derive(Debug)]
pub struct PreparedStatement {
    id: u64,
    template: InsertTemplate,
    positions: FxHashMap<Name, usize>,
}

impl PreparedStatement {
    pub fn new(id: u64, template: InsertTemplate) -> Self {
        let mut positions = FxHashMap::default();
        for (i, column) in template.columns().iter().enumerate() {
            positions.entry(column.key().clone()).or_insert(i);
        }
        Self { id, template, positions }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn template(&self) -> &InsertTemplate {
        &self.template
    }

    #[inline]
    pub fn query(&self) -> &str {
        self.template.query()
    }

    /// The number of bind markers.
    #[inline]
    pub fn len(&self) -> usize {
        self.template.columns().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn position(&self, name: &str) -> Result<usize> {
        self.positions
            .get(Name::from(name).as_str())
            .copied()
            .ok_or_else(|| Error::UnknownParameter { name: name.to_string() })
    }
}

/// A prepared statement with values bound to its markers, ready to execute.
#[derive(Debug, Clone)]
pub struct BoundStatement {
    prepared: Arc<PreparedStatement>,
    values: Box<[Option<Value>]>,
}

impl BoundStatement {
    pub fn new(prepared: Arc<PreparedStatement>) -> Self {
        let values = vec![None; prepared.len()].into_boxed_slice();
        Self { prepared, values }
    }

    #[inline]
    pub fn prepared(&self) -> &Arc<PreparedStatement> {
        &self.prepared
    }

    /// Binds `value` to the marker called `name` (case insensitive).
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let i = self.prepared.position(name)?;
        self.values[i] = Some(value.into());
        Ok(self)
    }

    /// Binds `value` to the marker at position `i`.
    #[inline]
    pub(crate) fn set_at(&mut self, i: usize, value: Value) {
        self.values[i] = Some(value);
    }

    #[inline]
    pub fn set_null(&mut self, name: &str) -> Result<&mut Self> {
        self.set(name, Value::Null)
    }

    /// The value bound to `name`, `None` if it is unbound or not a marker of this statement.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        let i = self.prepared.position(name).ok()?;
        self.values[i].as_ref()
    }

    #[inline]
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Whether every marker has a value (possibly an explicit null).
    #[inline]
    pub fn is_fully_bound(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    /// The names of the markers that have no value yet.
    pub fn unset(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns().filter(|(_, v)| v.is_none()).map(|(c, _)| c.name())
    }

    /// The columns of the statement along with their bound values, in marker order.
    pub fn columns(&self) -> impl Iterator<Item = (&Column, Option<&Value>)> + '_ {
        self.prepared.template().columns().iter().zip(self.values.iter().map(Option::as_ref))
    }

    /// Consumes the statement and returns the bound values in marker order.
    ///
    /// Unset markers are returned as `None`.
    pub fn into_values(self) -> Vec<Option<Value>> {
        self.values.into_vec()
    }
}

impl fmt::Display for BoundStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]",
            self.prepared.query(),
            self.columns().format_with(", ", |(column, value), f| match value {
                Some(value) => f(&format_args!("{}={value}", column.name())),
                None => f(&format_args!("{}=<unset>", column.name())),
            })
        )
    }
}
