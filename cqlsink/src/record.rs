use cqlsink_core::{Datum, Schema};

/// A record as handed over by the delivery framework.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Datum>,
    pub key_schema: Option<Schema>,
    pub value: Option<Datum>,
    pub value_schema: Option<Schema>,
}

impl SinkRecord {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            key_schema: None,
            value: None,
            value_schema: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<Datum>, schema: Option<Schema>) -> Self {
        self.key = Some(key.into());
        self.key_schema = schema;
        self
    }

    /// Sets a value without a schema, its type is decided by the target column.
    pub fn with_value(mut self, value: impl Into<Datum>) -> Self {
        self.value = Some(value.into());
        self.value_schema = None;
        self
    }

    pub fn with_typed_value(mut self, schema: Schema, value: impl Into<Datum>) -> Self {
        self.value = Some(value.into());
        self.value_schema = Some(schema);
        self
    }
}
