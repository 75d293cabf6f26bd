use std::fmt;

use itertools::Itertools;

use crate::{FieldType, SmolStr};

/// The schema a record carries alongside its key or value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    ty: FieldType,
    name: Option<SmolStr>,
    optional: bool,
    fields: Vec<Field>,
}

impl Schema {
    #[inline]
    pub fn primitive(ty: FieldType) -> Self {
        Self { ty, name: None, optional: true, fields: vec![] }
    }

    /// A struct schema with the given fields in order.
    pub fn structure(fields: impl IntoIterator<Item = Field>) -> Self {
        let fields = fields.into_iter().collect();
        Self { ty: FieldType::Struct, name: None, optional: true, fields }
    }

    #[inline]
    pub fn named(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    #[inline]
    pub fn ty(&self) -> FieldType {
        self.ty
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The fields of a struct schema, empty for every other type.
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            FieldType::Struct => write!(f, "struct<{}>", self.fields.iter().format(", ")),
            ty => write!(f, "{ty}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: SmolStr,
    schema: Schema,
}

impl Field {
    #[inline]
    pub fn new(name: impl Into<SmolStr>, schema: Schema) -> Self {
        Self { name: name.into(), schema }
    }

    #[inline]
    pub fn primitive(name: impl Into<SmolStr>, ty: FieldType) -> Self {
        Self::new(name, Schema::primitive(ty))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline]
    pub fn ty(&self) -> FieldType {
        self.schema.ty
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.schema)
    }
}
