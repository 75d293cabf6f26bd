use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// The declared type of a column as reported by the database catalog.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub enum LogicalType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Varint,
    Counter,
    Float,
    Double,
    Decimal,
    Boolean,
    Ascii,
    Text,
    Varchar,
    Blob,
    Timestamp,
    Date,
    Time,
    Uuid,
    TimeUuid,
    Inet,
    Duration,
    List(Box<LogicalType>),
    Set(Box<LogicalType>),
    Map(Box<LogicalType>, Box<LogicalType>),
    /// A user defined or otherwise unrecognized type, kept by name
    Custom(String),
}

impl FromStr for LogicalType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Some(inner) = parametric(&s, "list") {
            return Ok(Self::List(Box::new(inner.parse()?)));
        }
        if let Some(inner) = parametric(&s, "set") {
            return Ok(Self::Set(Box::new(inner.parse()?)));
        }
        if let Some(inner) = parametric(&s, "map") {
            let Some((k, v)) = inner.split_once(',') else {
                bail!("expected two type arguments in `{s}`")
            };
            return Ok(Self::Map(Box::new(k.parse()?), Box::new(v.parse()?)));
        }

        match s.as_str() {
            "tinyint" => Ok(Self::TinyInt),
            "smallint" => Ok(Self::SmallInt),
            "int" => Ok(Self::Int),
            "bigint" => Ok(Self::BigInt),
            "varint" => Ok(Self::Varint),
            "counter" => Ok(Self::Counter),
            "float" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            "decimal" => Ok(Self::Decimal),
            "boolean" => Ok(Self::Boolean),
            "ascii" => Ok(Self::Ascii),
            "text" => Ok(Self::Text),
            "varchar" => Ok(Self::Varchar),
            "blob" => Ok(Self::Blob),
            "timestamp" => Ok(Self::Timestamp),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "uuid" => Ok(Self::Uuid),
            "timeuuid" => Ok(Self::TimeUuid),
            "inet" => Ok(Self::Inet),
            "duration" => Ok(Self::Duration),
            "" => bail!("empty type name"),
            _ if s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                Ok(Self::Custom(s.to_string()))
            }
            _ => bail!("unhandled value `{s}` in LogicalType::from_str"),
        }
    }
}

fn parametric<'a>(s: &'a str, constructor: &str) -> Option<&'a str> {
    s.strip_prefix(constructor)?.trim_start().strip_prefix('<')?.strip_suffix('>')
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::TinyInt => write!(f, "tinyint"),
            LogicalType::SmallInt => write!(f, "smallint"),
            LogicalType::Int => write!(f, "int"),
            LogicalType::BigInt => write!(f, "bigint"),
            LogicalType::Varint => write!(f, "varint"),
            LogicalType::Counter => write!(f, "counter"),
            LogicalType::Float => write!(f, "float"),
            LogicalType::Double => write!(f, "double"),
            LogicalType::Decimal => write!(f, "decimal"),
            LogicalType::Boolean => write!(f, "boolean"),
            LogicalType::Ascii => write!(f, "ascii"),
            LogicalType::Text => write!(f, "text"),
            LogicalType::Varchar => write!(f, "varchar"),
            LogicalType::Blob => write!(f, "blob"),
            LogicalType::Timestamp => write!(f, "timestamp"),
            LogicalType::Date => write!(f, "date"),
            LogicalType::Time => write!(f, "time"),
            LogicalType::Uuid => write!(f, "uuid"),
            LogicalType::TimeUuid => write!(f, "timeuuid"),
            LogicalType::Inet => write!(f, "inet"),
            LogicalType::Duration => write!(f, "duration"),
            LogicalType::List(element) => write!(f, "list<{element}>"),
            LogicalType::Set(element) => write!(f, "set<{element}>"),
            LogicalType::Map(key, value) => write!(f, "map<{key}, {value}>"),
            LogicalType::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// The self-declared type of a field in a record's value schema.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum FieldType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Boolean,
    String,
    Bytes,
    Array,
    Map,
    Struct,
}

impl FieldType {
    #[inline]
    pub fn is_primitive(self) -> bool {
        !matches!(self, FieldType::Array | FieldType::Map | FieldType::Struct)
    }
}

impl FromStr for FieldType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "int64" => Ok(Self::Int64),
            "float32" => Ok(Self::Float32),
            "float64" => Ok(Self::Float64),
            "boolean" => Ok(Self::Boolean),
            "string" => Ok(Self::String),
            "bytes" => Ok(Self::Bytes),
            "array" => Ok(Self::Array),
            "map" => Ok(Self::Map),
            "struct" => Ok(Self::Struct),
            _ => bail!("unhandled value `{s}` in FieldType::from_str"),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int8 => write!(f, "int8"),
            FieldType::Int16 => write!(f, "int16"),
            FieldType::Int32 => write!(f, "int32"),
            FieldType::Int64 => write!(f, "int64"),
            FieldType::Float32 => write!(f, "float32"),
            FieldType::Float64 => write!(f, "float64"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::String => write!(f, "string"),
            FieldType::Bytes => write!(f, "bytes"),
            FieldType::Array => write!(f, "array"),
            FieldType::Map => write!(f, "map"),
            FieldType::Struct => write!(f, "struct"),
        }
    }
}
