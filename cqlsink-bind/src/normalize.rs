use cqlsink_catalog::TableSchema;
use cqlsink_core::{Datum, FieldType, Name, Schema, Struct};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::{Error, Result};

/// Where the type of a record value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    /// The record carried no schema, so the column's declared type decides.
    Untyped,
    /// The type the record's own schema declares for the field.
    Typed(FieldType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub hint: TypeHint,
    pub datum: Datum,
}

/// A record reshaped to the target table: one slot per column, in column order.
///
/// A `None` slot is a column the record does not supply (or supplies as null).
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    slots: Box<[Option<Entry>]>,
}

impl CanonicalRecord {
    /// Normalizes a schema-less map record.
    pub fn from_map(schema: &TableSchema, map: IndexMap<String, Datum>) -> Result<Self> {
        let fields = map.into_iter().map(|(name, datum)| (name, TypeHint::Untyped, datum));
        Self::normalize(schema, fields.collect())
    }

    /// Normalizes a structured record against the fields of its value schema.
    ///
    /// The value schema must be a flat struct, every field of a primitive type.
    pub fn from_struct(
        schema: &TableSchema,
        value_schema: &Schema,
        mut value: Struct,
    ) -> Result<Self> {
        if value_schema.ty() != FieldType::Struct
            || value_schema.fields().iter().any(|field| !field.ty().is_primitive())
        {
            return Err(Error::InvalidRecordShape {
                expected: "a flat struct schema",
                found: value_schema.to_string(),
            });
        }

        let fields = value_schema
            .fields()
            .iter()
            .map(|field| {
                let datum = value.take(field.name());
                (field.name().to_string(), TypeHint::Typed(field.ty()), datum)
            })
            .collect::<Vec<_>>();
        Self::normalize(schema, fields)
    }

    fn normalize(schema: &TableSchema, fields: Vec<(String, TypeHint, Datum)>) -> Result<Self> {
        check_capitalization(fields.iter().map(|(name, ..)| name.as_str()))?;

        if fields.len() > schema.len() {
            tracing::debug!(
                fields = fields.len(),
                columns = schema.len(),
                "record has more fields than the table"
            );
            return Err(unknown_columns(schema, fields.into_iter().map(|(name, ..)| name)));
        }

        let mut slots = vec![None; schema.len()].into_boxed_slice();
        let mut unknown = vec![];
        for (name, hint, datum) in fields {
            match schema.position(Name::from(&name).as_str()) {
                Some(_) if datum.is_null() => {}
                Some(i) => slots[i] = Some(Entry { hint, datum }),
                None => unknown.push(name),
            }
        }

        if !unknown.is_empty() {
            return Err(unknown_columns(schema, unknown));
        }

        Ok(Self { slots })
    }

    /// The entry for the column at `index` in the table schema.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.slots.get(index)?.as_ref()
    }

    /// The number of columns the record supplies a value for.
    #[inline]
    pub fn supplied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    #[inline]
    pub(crate) fn into_slots(self) -> Box<[Option<Entry>]> {
        self.slots
    }
}

/// Fails if two field names only differ in capitalization.
fn check_capitalization<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut lower_to_orig = FxHashMap::<Name, &str>::default();
    for name in names {
        if let Some(existing) = lower_to_orig.insert(Name::from(name), name) {
            return Err(Error::DuplicateColumnCapitalization {
                field: name.to_string(),
                existing: existing.to_string(),
            });
        }
    }
    Ok(())
}

fn unknown_columns(schema: &TableSchema, names: impl IntoIterator<Item = String>) -> Error {
    let mut fields = names
        .into_iter()
        .filter(|name| !schema.contains(Name::from(name).as_str()))
        .collect::<Vec<_>>();
    fields.sort();
    Error::UnknownColumn { table: format!("{}.{}", schema.keyspace(), schema.table()), fields }
}
