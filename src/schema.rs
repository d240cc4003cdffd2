// VecBase Ingest — schema.rs
// Field declarations, schema validation and the SchemaBuilder.
// Author: d65v <https://github.com/d65v>

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Collection name must not be empty")]
    EmptyCollectionName,

    #[error("Field at position {position} has an empty name")]
    EmptyFieldName { position: usize },

    #[error("Duplicate field name: {name}")]
    DuplicateField { name: String },

    #[error("Schema has no primary key field")]
    NoPrimaryKey,

    #[error("Schema has more than one primary key: {fields:?}")]
    MultiplePrimaryKeys { fields: Vec<String> },

    #[error("Primary key '{field}' has unsupported kind {kind} (need Int64 or VarChar)")]
    UnsupportedPrimaryKey { field: String, kind: FieldKind },

    #[error("Field '{field}' is auto-id but not the primary key")]
    AutoIdWithoutPrimaryKey { field: String },

    #[error("Vector field '{field}' has no dimension")]
    MissingDimension { field: String },

    #[error("Field '{field}' has no max length")]
    MissingMaxLength { field: String },

    #[error("Array field '{field}' has no max capacity")]
    MissingMaxCapacity { field: String },

    #[error("Field '{field}': {param} must be greater than zero")]
    ZeroParam { field: String, param: &'static str },

    #[error("Schema has no vector field")]
    NoVectorField,
}

// ── Field Kinds ───────────────────────────────────────────────────────────────

/// Semantic column type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Int64,
    Int32,
    Int16,
    Int8,
    Bool,
    Double,
    VarChar,
    FloatVector,
    StringArray,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Int64 => "Int64",
            FieldKind::Int32 => "Int32",
            FieldKind::Int16 => "Int16",
            FieldKind::Int8 => "Int8",
            FieldKind::Bool => "Bool",
            FieldKind::Double => "Double",
            FieldKind::VarChar => "VarChar",
            FieldKind::FloatVector => "FloatVector",
            FieldKind::StringArray => "StringArray",
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, FieldKind::FloatVector)
    }

    /// Kinds whose values (or elements) are strings bounded by `max_length`.
    pub fn is_string(&self) -> bool {
        matches!(self, FieldKind::VarChar | FieldKind::StringArray)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Field ─────────────────────────────────────────────────────────────────────

/// One column definition. Built with the `with_*` chain:
///
/// ```
/// use vingest::schema::{Field, FieldKind};
/// let id = Field::new("ID", FieldKind::Int64).with_primary_key(true);
/// let emb = Field::new("embeddings", FieldKind::FloatVector).with_dim(64);
/// assert!(id.is_primary_key);
/// assert_eq!(emb.dim, Some(64));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_auto_id: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dim: Option<u32>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_primary_key: false,
            is_auto_id: false,
            max_length: None,
            max_capacity: None,
            dim: None,
        }
    }

    pub fn with_primary_key(mut self, pk: bool) -> Self {
        self.is_primary_key = pk;
        self
    }

    pub fn with_auto_id(mut self, auto_id: bool) -> Self {
        self.is_auto_id = auto_id;
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: u32) -> Self {
        self.max_capacity = Some(max_capacity);
        self
    }

    pub fn with_dim(mut self, dim: u32) -> Self {
        self.dim = Some(dim);
        self
    }

    /// True when insert calls must carry a column for this field.
    /// Auto-id primary keys are assigned by the store.
    pub fn is_caller_supplied(&self) -> bool {
        !(self.is_primary_key && self.is_auto_id)
    }

    fn validate(&self, position: usize) -> Result<(), SchemaError> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyFieldName { position });
        }
        if self.is_auto_id && !self.is_primary_key {
            return Err(SchemaError::AutoIdWithoutPrimaryKey {
                field: self.name.clone(),
            });
        }

        if self.kind.is_vector() {
            self.check_param("dim", self.dim, |field| SchemaError::MissingDimension { field })?;
        }
        if self.kind.is_string() {
            self.check_param("max_length", self.max_length, |field| {
                SchemaError::MissingMaxLength { field }
            })?;
        }
        if self.kind == FieldKind::StringArray {
            self.check_param("max_capacity", self.max_capacity, |field| {
                SchemaError::MissingMaxCapacity { field }
            })?;
        }

        if self.is_primary_key && !matches!(self.kind, FieldKind::Int64 | FieldKind::VarChar) {
            return Err(SchemaError::UnsupportedPrimaryKey {
                field: self.name.clone(),
                kind: self.kind,
            });
        }

        Ok(())
    }

    fn check_param(
        &self,
        param: &'static str,
        value: Option<u32>,
        absent: impl FnOnce(String) -> SchemaError,
    ) -> Result<(), SchemaError> {
        match value {
            None => Err(absent(self.name.clone())),
            Some(0) => Err(SchemaError::ZeroParam {
                field: self.name.clone(),
                param,
            }),
            Some(_) => Ok(()),
        }
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// A validated collection schema. Field order is the on-wire column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    name: String,
    description: String,
    fields: Vec<Field>,
}

impl Schema {
    /// Validate `fields` and assemble a schema.
    ///
    /// # Errors
    /// Returns the first `SchemaError` found, checking fields in order and then
    /// the collection-wide rules (primary key count, vector presence).
    pub fn build(
        fields: Vec<Field>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchemaError::EmptyCollectionName);
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            field.validate(position)?;
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    name: field.name.clone(),
                });
            }
        }

        let pks: Vec<String> = fields
            .iter()
            .filter(|f| f.is_primary_key)
            .map(|f| f.name.clone())
            .collect();
        match pks.len() {
            0 => return Err(SchemaError::NoPrimaryKey),
            1 => {}
            _ => return Err(SchemaError::MultiplePrimaryKeys { fields: pks }),
        }

        if !fields.iter().any(|f| f.kind.is_vector()) {
            return Err(SchemaError::NoVectorField);
        }

        Ok(Self {
            name,
            description: description.into(),
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key(&self) -> &Field {
        // Schema::build guarantees exactly one.
        self.fields
            .iter()
            .find(|f| f.is_primary_key)
            .unwrap_or(&self.fields[0])
    }

    /// Fields that every insert call must carry, in schema order.
    pub fn insert_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_caller_supplied())
    }

    /// First vector field in schema order; the default index target.
    pub fn first_vector_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.kind.is_vector())
    }

    /// Same fields under another collection name.
    pub fn renamed(&self, name: impl Into<String>) -> Result<Self, SchemaError> {
        Self::build(self.fields.clone(), name, self.description.clone())
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Incremental schema declaration.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    name: String,
    description: String,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        Schema::build(self.fields, self.name, self.description)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
