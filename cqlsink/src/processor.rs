use cqlsink_bind::{Binder, BoundStatement, CanonicalRecord, InsertTemplate};
use cqlsink_catalog::TableSchema;
use cqlsink_core::{Datum, FieldType};

use crate::{Result, Session, SinkRecord};

/// A record that could not be turned into a statement.
#[derive(Debug)]
pub struct Rejected {
    /// Position of the record within its batch.
    pub index: usize,
    /// The record's offset in its topic partition.
    pub offset: i64,
    pub error: cqlsink_bind::Error,
}

#[derive(Debug, Default)]
pub struct BatchOutput {
    /// The bound inserts, in record arrival order.
    pub statements: Vec<BoundStatement>,
    pub rejected: Vec<Rejected>,
    /// The number of records without a value.
    pub skipped: usize,
}

/// Turns a batch of records into inserts against one table.
pub struct BatchProcessor<'a, S: ?Sized> {
    session: &'a S,
    keyspace: &'a str,
    table: &'a str,
}

impl<'a, S: Session + ?Sized> BatchProcessor<'a, S> {
    pub fn new(session: &'a S, keyspace: &'a str, table: &'a str) -> Self {
        Self { session, keyspace, table }
    }

    /// Binds every record of the batch to a freshly loaded schema of the target table.
    ///
    /// Schema and prepare failures fail the whole batch. A record that cannot be bound is reported
    /// in [`BatchOutput::rejected`] and does not affect the other records.
    #[tracing::instrument(
        skip_all,
        fields(keyspace = self.keyspace, table = self.table, records = records.len())
    )]
    pub fn process(&self, records: Vec<SinkRecord>) -> Result<BatchOutput> {
        let schema = cqlsink_catalog::load_schema(&self.session, self.keyspace, self.table)?;
        let template = InsertTemplate::build(&schema)?;
        let prepared = self.session.prepare(template)?;
        tracing::info!(query = %prepared.query(), "prepared insert");

        let binder = Binder::new(&schema, &prepared)?;
        let mut output = BatchOutput::default();
        for (index, record) in records.into_iter().enumerate() {
            let offset = record.offset;
            match bind_record(&schema, &binder, record) {
                Ok(Some(stmt)) => {
                    tracing::debug!(index, offset, %stmt, "bound record");
                    output.statements.push(stmt);
                }
                Ok(None) => {
                    tracing::debug!(index, offset, "skipping record without a value");
                    output.skipped += 1;
                }
                Err(error) => {
                    tracing::warn!(index, offset, %error, "rejected record");
                    output.rejected.push(Rejected { index, offset, error });
                }
            }
        }

        tracing::info!(
            statements = output.statements.len(),
            rejected = output.rejected.len(),
            skipped = output.skipped,
            "processed batch"
        );
        Ok(output)
    }
}

fn bind_record(
    schema: &TableSchema,
    binder: &Binder<'_>,
    record: SinkRecord,
) -> cqlsink_bind::Result<Option<BoundStatement>> {
    let value = match record.value {
        None | Some(Datum::Null) => return Ok(None),
        Some(value) => value,
    };

    let canonical = match (record.value_schema, value) {
        (None, Datum::Map(map)) => CanonicalRecord::from_map(schema, map)?,
        (None, value) => {
            return Err(cqlsink_bind::Error::InvalidRecordShape {
                expected: "map value",
                found: format!("{} value", type_name(&value)),
            });
        }
        (Some(value_schema), Datum::Struct(value)) if value_schema.ty() == FieldType::Struct => {
            CanonicalRecord::from_struct(schema, &value_schema, value)?
        }
        (Some(value_schema), value) => {
            return Err(cqlsink_bind::Error::InvalidRecordShape {
                expected: "struct value with a struct schema",
                found: format!("{} value with a {} schema", type_name(&value), value_schema.ty()),
            });
        }
    };

    binder.bind(canonical).map(Some)
}

fn type_name(datum: &Datum) -> String {
    datum.ty().map_or_else(|| "null".to_string(), |ty| ty.to_string())
}
