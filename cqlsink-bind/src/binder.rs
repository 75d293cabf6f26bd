use std::sync::Arc;

use bytes::Bytes;
use chrono::{NaiveDateTime, TimeZone, Utc};
use cqlsink_catalog::{Column, TableSchema};
use cqlsink_core::{Datum, FieldType, FromDatum, LogicalType, Value};

use crate::{BoundStatement, CanonicalRecord, Entry, Error, PreparedStatement, Result, TypeHint};

/// The only accepted textual timestamp format, interpreted as UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Binds canonical records to the prepared insert of one batch.
pub struct Binder<'a> {
    schema: &'a TableSchema,
    prepared: &'a Arc<PreparedStatement>,
}

impl<'a> Binder<'a> {
    /// Fails unless `prepared` has one marker per column of `schema`, in table order.
    pub fn new(schema: &'a TableSchema, prepared: &'a Arc<PreparedStatement>) -> Result<Self> {
        if prepared.template().columns() != schema.columns() {
            tracing::error!(
                table = schema.table(),
                query = %prepared.query(),
                "statement does not match table"
            );
            return Err(Error::StatementMismatch {
                table: schema.table().to_string(),
                query: prepared.query().to_string(),
            });
        }
        Ok(Self { schema, prepared })
    }

    /// Coerces every value of `record` to its column and binds it to the column's marker.
    ///
    /// Columns are bound in table order and columns the record does not supply are bound to null,
    /// so every marker of the returned statement is set.
    pub fn bind(&self, record: CanonicalRecord) -> Result<BoundStatement> {
        let mut stmt = BoundStatement::new(Arc::clone(self.prepared));
        let slots = record.into_slots().into_vec();
        for (i, (column, slot)) in self.schema.columns().iter().zip(slots).enumerate() {
            let value = match slot {
                None => {
                    tracing::debug!(column = %column.name(), "column not in record, binding null");
                    Value::Null
                }
                Some(Entry { hint: TypeHint::Untyped, datum }) => coerce_to_column(column, datum)?,
                Some(Entry { hint: TypeHint::Typed(ty), datum }) => {
                    coerce_to_field_type(column, ty, datum)?
                }
            };
            tracing::trace!(column = %column.name(), ty = %column.logical_type(), %value, "bind");
            // markers follow table order, names that only differ by case share a key
            stmt.set_at(i, value);
        }
        Ok(stmt)
    }
}

/// Coerces a value from a schema-less record using the column's declared type.
fn coerce_to_column(column: &Column, datum: Datum) -> Result<Value> {
    let value = match column.logical_type() {
        LogicalType::Int => Value::Int(cast(column, datum)?),
        LogicalType::BigInt => Value::BigInt(cast(column, datum)?),
        LogicalType::Float => Value::Float(cast(column, datum)?),
        LogicalType::Double => Value::Double(cast(column, datum)?),
        LogicalType::Text | LogicalType::Varchar => Value::Text(cast(column, datum)?),
        LogicalType::Boolean => Value::Boolean(cast(column, datum)?),
        LogicalType::Blob => Value::Blob(cast::<Bytes>(column, datum)?),
        LogicalType::Timestamp => timestamp(column, datum)?,
        ty => {
            tracing::error!(column = %column.name(), %ty, "unsupported column type");
            return Err(Error::UnsupportedColumnType {
                column: column.name().to_string(),
                ty: ty.clone(),
            });
        }
    };
    Ok(value)
}

fn cast<T: FromDatum>(column: &Column, datum: Datum) -> Result<T> {
    datum.cast::<T>().map_err(|err| mismatch(column, column.logical_type(), err.datum()))
}

fn timestamp(column: &Column, datum: Datum) -> Result<Value> {
    let millis = match datum {
        Datum::String(s) => {
            return parse_timestamp(&s).map(Value::Timestamp).ok_or_else(|| {
                Error::TimestampFormat { column: column.name().to_string(), value: s }
            });
        }
        Datum::Int32(millis) => i64::from(millis),
        Datum::Int64(millis) => millis,
        datum => return Err(mismatch(column, "string, int or bigint", &datum)),
    };

    Utc.timestamp_millis_opt(millis)
        .single()
        .map(Value::Timestamp)
        .ok_or_else(|| Error::TimestampOutOfRange { column: column.name().to_string(), millis })
}

/// Parses a timestamp that is exactly in `yyyy-MM-dd HH:mm:ss` form.
fn parse_timestamp(s: &str) -> Option<chrono::DateTime<Utc>> {
    const SHAPE: &[u8; 19] = b"0000-00-00 00:00:00";
    let bytes = s.as_bytes();
    // chrono accepts unpadded fields and surrounding whitespace, the format is stricter than that
    let well_formed = bytes.len() == SHAPE.len()
        && bytes.iter().zip(SHAPE).all(|(&b, &expected)| match expected {
            b'0' => b.is_ascii_digit(),
            _ => b == expected,
        });
    if !well_formed {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Coerces a value from a structured record using the field's own declared type.
///
/// The field type is trusted, it is not reconciled with the column's declared type.
fn coerce_to_field_type(column: &Column, ty: FieldType, datum: Datum) -> Result<Value> {
    let value = match (ty, datum) {
        (ty, _) if !ty.is_primitive() => {
            tracing::error!(field = %column.name(), %ty, "unsupported field type");
            return Err(Error::UnsupportedFieldType { field: column.name().to_string(), ty });
        }
        (FieldType::Int8, Datum::Int8(i)) => Value::Int(i.into()),
        (FieldType::Int16, Datum::Int16(i)) => Value::SmallInt(i),
        (FieldType::Int32, Datum::Int32(i)) => Value::Int(i),
        (FieldType::Int64, Datum::Int64(i)) => Value::BigInt(i),
        (FieldType::Float32, Datum::Float32(x)) => Value::Float(x),
        (FieldType::Float64, Datum::Float64(x)) => Value::Double(x),
        (FieldType::Boolean, Datum::Boolean(b)) => Value::Boolean(b),
        (FieldType::String, Datum::String(s)) => Value::Text(s),
        (FieldType::Bytes, Datum::Bytes(bytes)) => Value::Blob(bytes.into()),
        (FieldType::Bytes, Datum::Buffer(buf)) => Value::Blob(buf),
        (ty, datum) => return Err(mismatch(column, ty, &datum)),
    };
    Ok(value)
}

fn mismatch(column: &Column, expected: impl ToString, datum: &Datum) -> Error {
    Error::TypeMismatch {
        column: column.name().to_string(),
        expected: expected.to_string(),
        found: datum.ty().map_or_else(|| "null".to_string(), |ty| ty.to_string()),
    }
}
