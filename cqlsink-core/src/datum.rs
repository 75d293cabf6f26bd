use std::error::Error;
use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::FieldType;

pub struct CastError<T> {
    datum: Datum,
    phantom: PhantomData<fn() -> T>,
}

impl<T> CastError<T> {
    pub fn new(datum: Datum) -> Self {
        Self { datum, phantom: PhantomData }
    }

    #[inline]
    pub fn datum(&self) -> &Datum {
        &self.datum
    }
}

impl<T> fmt::Debug for CastError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl<T> fmt::Display for CastError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot cast value {:?} of type {} to {}",
            self.datum,
            self.datum.ty().map_or_else(|| "null".to_string(), |ty| ty.to_string()),
            std::any::type_name::<T>()
        )
    }
}

impl<T> Error for CastError<T> {}

/// A runtime value as delivered by the upstream record framework.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Boolean(bool),
    String(String),
    /// A raw byte array
    Bytes(Vec<u8>),
    /// An already buffered byte sequence
    Buffer(Bytes),
    Array(Vec<Datum>),
    Map(IndexMap<String, Datum>),
    Struct(Struct),
}

impl Datum {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// The runtime type of this datum, `None` for null.
    #[inline]
    pub fn ty(&self) -> Option<FieldType> {
        let ty = match self {
            Datum::Null => return None,
            Datum::Int8(_) => FieldType::Int8,
            Datum::Int16(_) => FieldType::Int16,
            Datum::Int32(_) => FieldType::Int32,
            Datum::Int64(_) => FieldType::Int64,
            Datum::Float32(_) => FieldType::Float32,
            Datum::Float64(_) => FieldType::Float64,
            Datum::Boolean(_) => FieldType::Boolean,
            Datum::String(_) => FieldType::String,
            Datum::Bytes(_) | Datum::Buffer(_) => FieldType::Bytes,
            Datum::Array(_) => FieldType::Array,
            Datum::Map(_) => FieldType::Map,
            Datum::Struct(_) => FieldType::Struct,
        };
        Some(ty)
    }

    #[inline]
    pub fn cast<T: FromDatum>(self) -> Result<T, CastError<T>> {
        T::from_datum(self)
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "null"),
            Datum::Int8(i) => write!(f, "{i}"),
            Datum::Int16(i) => write!(f, "{i}"),
            Datum::Int32(i) => write!(f, "{i}"),
            Datum::Int64(i) => write!(f, "{i}"),
            Datum::Float32(x) => write!(f, "{x}"),
            Datum::Float64(x) => write!(f, "{x}"),
            Datum::Boolean(b) => write!(f, "{b}"),
            Datum::String(s) => write!(f, "{s:?}"),
            Datum::Bytes(bytes) => write!(f, "{bytes:x?}"),
            Datum::Buffer(bytes) => write!(f, "{:x?}", &bytes[..]),
            Datum::Array(values) => write!(f, "[{}]", values.iter().format(", ")),
            Datum::Map(entries) => write!(
                f,
                "{{{}}}",
                entries.iter().format_with(", ", |(k, v), f| f(&format_args!("{k:?}: {v}")))
            ),
            Datum::Struct(s) => write!(f, "{s}"),
        }
    }
}

impl From<i8> for Datum {
    #[inline]
    fn from(v: i8) -> Self {
        Self::Int8(v)
    }
}

impl From<i16> for Datum {
    #[inline]
    fn from(v: i16) -> Self {
        Self::Int16(v)
    }
}

impl From<i32> for Datum {
    #[inline]
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Datum {
    #[inline]
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for Datum {
    #[inline]
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for Datum {
    #[inline]
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<bool> for Datum {
    #[inline]
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for Datum {
    #[inline]
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Datum {
    #[inline]
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for Datum {
    #[inline]
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Bytes> for Datum {
    #[inline]
    fn from(v: Bytes) -> Self {
        Self::Buffer(v)
    }
}

impl From<Struct> for Datum {
    #[inline]
    fn from(v: Struct) -> Self {
        Self::Struct(v)
    }
}

impl<K: Into<String>, V: Into<Datum>> FromIterator<(K, V)> for Datum {
    /// Collects into an untyped map datum.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The value half of a structured record.
/// Field types live in the accompanying [`Schema`](crate::Schema).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Struct {
    values: IndexMap<String, Datum>,
}

impl Struct {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn put(mut self, field: impl Into<String>, value: impl Into<Datum>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Removes and returns the value of `field`, a missing field reads as null.
    #[inline]
    pub fn take(&mut self, field: &str) -> Datum {
        self.values.shift_remove(field).unwrap_or(Datum::Null)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Struct{{{}}}",
            self.values.iter().format_with(",", |(k, v), f| f(&format_args!("{k}={v}")))
        )
    }
}

pub trait FromDatum: Sized {
    /// Cast an upstream `datum` to a rust value.
    fn from_datum(datum: Datum) -> Result<Self, CastError<Self>>;
}

impl FromDatum for i16 {
    fn from_datum(datum: Datum) -> Result<Self, CastError<Self>> {
        match datum {
            Datum::Int8(i) => Ok(i.into()),
            Datum::Int16(i) => Ok(i),
            _ => Err(CastError::new(datum)),
        }
    }
}

impl FromDatum for i32 {
    fn from_datum(datum: Datum) -> Result<Self, CastError<Self>> {
        match datum {
            Datum::Int8(i) => Ok(i.into()),
            Datum::Int16(i) => Ok(i.into()),
            Datum::Int32(i) => Ok(i),
            Datum::Int64(i) => i32::try_from(i).map_err(|_| CastError::new(datum)),
            _ => Err(CastError::new(datum)),
        }
    }
}

impl FromDatum for i64 {
    fn from_datum(datum: Datum) -> Result<Self, CastError<Self>> {
        match datum {
            Datum::Int8(i) => Ok(i.into()),
            Datum::Int16(i) => Ok(i.into()),
            Datum::Int32(i) => Ok(i.into()),
            Datum::Int64(i) => Ok(i),
            _ => Err(CastError::new(datum)),
        }
    }
}

impl FromDatum for f32 {
    fn from_datum(datum: Datum) -> Result<Self, CastError<Self>> {
        match datum {
            Datum::Float32(x) => Ok(x),
            _ => Err(CastError::new(datum)),
        }
    }
}

impl FromDatum for f64 {
    fn from_datum(datum: Datum) -> Result<Self, CastError<Self>> {
        match datum {
            Datum::Float32(x) => Ok(x.into()),
            Datum::Float64(x) => Ok(x),
            _ => Err(CastError::new(datum)),
        }
    }
}

impl FromDatum for bool {
    fn from_datum(datum: Datum) -> Result<Self, CastError<Self>> {
        match datum {
            Datum::Boolean(b) => Ok(b),
            _ => Err(CastError::new(datum)),
        }
    }
}

impl FromDatum for String {
    fn from_datum(datum: Datum) -> Result<Self, CastError<Self>> {
        match datum {
            Datum::String(s) => Ok(s),
            _ => Err(CastError::new(datum)),
        }
    }
}

impl FromDatum for Bytes {
    fn from_datum(datum: Datum) -> Result<Self, CastError<Self>> {
        match datum {
            Datum::Bytes(bytes) => Ok(Bytes::from(bytes)),
            Datum::Buffer(buf) => Ok(buf),
            _ => Err(CastError::new(datum)),
        }
    }
}
