//! Decoding of JSON-lines record files.
//!
//! A line is either a plain JSON value, delivered without a schema, or a
//! `{"schema": .., "payload": ..}` envelope whose schema follows the JSON converter layout.

use anyhow::{bail, Context};
use base64::Engine;
use cqlsink::{Datum, Field, FieldType, Schema, SinkRecord, Struct};
use serde::Deserialize;
use serde_json::Value as Json;

#[derive(Debug, Deserialize)]
struct Envelope {
    schema: JsonSchema,
    payload: Json,
}

#[derive(Debug, Deserialize)]
struct JsonSchema {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    optional: bool,
    name: Option<String>,
    #[serde(default)]
    fields: Vec<JsonField>,
}

#[derive(Debug, Deserialize)]
struct JsonField {
    field: String,
    #[serde(flatten)]
    schema: JsonSchema,
}

/// Decodes the record on line `offset` of `topic`, `None` for a blank line.
pub fn parse_record(topic: &str, offset: i64, line: &str) -> anyhow::Result<Option<SinkRecord>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let json = serde_json::from_str::<Json>(line).with_context(|| format!("line {offset}"))?;
    let record = SinkRecord::new(topic, 0, offset);
    let record = match json {
        Json::Object(obj) if is_envelope(&obj) => {
            let envelope = serde_json::from_value::<Envelope>(Json::Object(obj))
                .with_context(|| format!("invalid envelope on line {offset}"))?;
            let schema = schema(&envelope.schema)?;
            let value = payload(&schema, envelope.payload)
                .with_context(|| format!("invalid payload on line {offset}"))?;
            record.with_typed_value(schema, value)
        }
        json => record.with_value(datum(json)),
    };
    Ok(Some(record))
}

fn is_envelope(obj: &serde_json::Map<String, Json>) -> bool {
    obj.len() == 2 && obj.contains_key("schema") && obj.contains_key("payload")
}

fn schema(json: &JsonSchema) -> anyhow::Result<Schema> {
    let ty = json.ty.parse::<FieldType>()?;
    let mut schema = match ty {
        FieldType::Struct => Schema::structure(
            json.fields
                .iter()
                .map(|field| Ok(Field::new(field.field.as_str(), schema(&field.schema)?)))
                .collect::<anyhow::Result<Vec<_>>>()?,
        ),
        ty => Schema::primitive(ty),
    };
    if let Some(name) = &json.name {
        schema = schema.named(name.as_str());
    }
    if !json.optional {
        schema = schema.required();
    }
    Ok(schema)
}

/// Converts a payload according to its schema.
fn payload(schema: &Schema, json: Json) -> anyhow::Result<Datum> {
    let datum = match (schema.ty(), json) {
        (_, Json::Null) => Datum::Null,
        (FieldType::Int8, Json::Number(n)) => Datum::Int8(integer(&n)?),
        (FieldType::Int16, Json::Number(n)) => Datum::Int16(integer(&n)?),
        (FieldType::Int32, Json::Number(n)) => Datum::Int32(integer(&n)?),
        (FieldType::Int64, Json::Number(n)) => Datum::Int64(integer(&n)?),
        (FieldType::Float32, Json::Number(n)) => Datum::Float32(float(&n)? as f32),
        (FieldType::Float64, Json::Number(n)) => Datum::Float64(float(&n)?),
        (FieldType::Boolean, Json::Bool(b)) => Datum::Boolean(b),
        (FieldType::String, Json::String(s)) => Datum::String(s),
        // the JSON converter encodes byte fields as base64 strings
        (FieldType::Bytes, Json::String(s)) => Datum::Bytes(
            base64::engine::general_purpose::STANDARD
                .decode(&s)
                .with_context(|| format!("invalid base64 `{s}`"))?,
        ),
        (FieldType::Array, json @ Json::Array(_)) | (FieldType::Map, json @ Json::Object(_)) => {
            datum(json)
        }
        (FieldType::Struct, Json::Object(mut obj)) => {
            let mut value = Struct::new();
            for field in schema.fields() {
                let json = obj.remove(field.name()).unwrap_or(Json::Null);
                let datum = payload(field.schema(), json)
                    .with_context(|| format!("field `{}`", field.name()))?;
                value = value.put(field.name(), datum);
            }
            Datum::Struct(value)
        }
        (ty, json) => bail!("expected {ty}, found `{json}`"),
    };
    Ok(datum)
}

fn integer<T: TryFrom<i64>>(n: &serde_json::Number) -> anyhow::Result<T> {
    match n.as_i64().map(T::try_from) {
        Some(Ok(i)) => Ok(i),
        _ => bail!("integer `{n}` is out of range"),
    }
}

fn float(n: &serde_json::Number) -> anyhow::Result<f64> {
    n.as_f64().with_context(|| format!("`{n}` is not a number"))
}

/// Converts a value without a schema: integers become int64, other numbers float64.
fn datum(json: Json) -> Datum {
    match json {
        Json::Null => Datum::Null,
        Json::Bool(b) => Datum::Boolean(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Datum::Int64(i),
            None => n.as_f64().map_or(Datum::Null, Datum::Float64),
        },
        Json::String(s) => Datum::String(s),
        Json::Array(values) => Datum::Array(values.into_iter().map(datum).collect()),
        Json::Object(obj) => obj.into_iter().map(|(k, v)| (k, datum(v))).collect(),
    }
}
