#![deny(rust_2018_idioms)]

pub mod datum;
pub mod schema;
pub mod ty;
pub mod value;

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

pub use anyhow;
pub use smol_str::SmolStr;

pub use self::datum::{CastError, Datum, FromDatum, Struct};
pub use self::schema::{Field, Schema};
pub use self::ty::{FieldType, LogicalType};
pub use self::value::Value;

/// Lowercase name of a column, keyspace or table (for case insensitive lookup)
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    name: SmolStr,
}

impl PartialEq<&str> for Name {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.name == other.to_lowercase()
    }
}

impl Name {
    #[inline]
    pub fn as_str(&self) -> &str {
        self.name.as_str()
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Name {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)
    }
}

impl Deref for Name {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.name.deref()
    }
}

impl<S> From<S> for Name
where
    S: AsRef<str>,
{
    fn from(s: S) -> Self {
        Self { name: SmolStr::new(s.as_ref().to_lowercase()) }
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        self.name.as_ref()
    }
}
