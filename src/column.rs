// VecBase Ingest — column.rs
// Typed column buffers and the pre-insert alignment check.
// Author: d65v <https://github.com/d65v>

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{Field, FieldKind, Schema};

// ── Errors ────────────────────────────────────────────────────────────────────

/// A batch of columns that does not line up with the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnError {
    #[error("Missing column for field '{field}'")]
    MissingColumn { field: String },

    #[error("Unexpected column '{column}'")]
    UnexpectedColumn { column: String },

    #[error("Column '{column}' supplied more than once")]
    DuplicateColumn { column: String },

    #[error("Column order mismatch at position {position}: expected '{expected}', got '{found}'")]
    OutOfOrder {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Column '{field}' has kind {found}, schema says {expected}")]
    KindMismatch {
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    #[error("Column '{field}' has {found} rows, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("Vector column '{field}': dimension {found} ≠ schema dimension {expected}")]
    DimensionMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("Vector column '{field}': {values} values do not split into rows of {dim}")]
    RaggedVectors {
        field: String,
        dim: usize,
        values: usize,
    },

    #[error("Column '{field}' row {row}: string of {len} bytes exceeds max length {max}")]
    StringTooLong {
        field: String,
        row: usize,
        len: usize,
        max: usize,
    },

    #[error("Column '{field}' row {row}: array of {len} elements exceeds max capacity {max}")]
    ArrayTooLong {
        field: String,
        row: usize,
        len: usize,
        max: usize,
    },
}

// ── Column Data ───────────────────────────────────────────────────────────────

/// Host representation of one column, one variant per field kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Int64(Vec<i64>),
    Int32(Vec<i32>),
    Int16(Vec<i16>),
    Int8(Vec<i8>),
    Bool(Vec<bool>),
    Double(Vec<f64>),
    VarChar(Vec<String>),
    /// Row-major, `values.len() == rows * dim`.
    FloatVector { dim: usize, values: Vec<f32> },
    StringArray(Vec<Vec<String>>),
}

impl ColumnData {
    pub fn kind(&self) -> FieldKind {
        match self {
            ColumnData::Int64(_) => FieldKind::Int64,
            ColumnData::Int32(_) => FieldKind::Int32,
            ColumnData::Int16(_) => FieldKind::Int16,
            ColumnData::Int8(_) => FieldKind::Int8,
            ColumnData::Bool(_) => FieldKind::Bool,
            ColumnData::Double(_) => FieldKind::Double,
            ColumnData::VarChar(_) => FieldKind::VarChar,
            ColumnData::FloatVector { .. } => FieldKind::FloatVector,
            ColumnData::StringArray(_) => FieldKind::StringArray,
        }
    }

    /// Number of rows held.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int64(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int8(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Double(v) => v.len(),
            ColumnData::VarChar(v) => v.len(),
            ColumnData::FloatVector { dim, values } => {
                if *dim == 0 {
                    0
                } else {
                    values.len() / dim
                }
            }
            ColumnData::StringArray(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Column Buffer ─────────────────────────────────────────────────────────────

/// Named column ready to be handed to `StoreClient::insert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBuffer {
    pub field_name: String,
    pub data: ColumnData,
}

impl ColumnBuffer {
    pub fn new(field_name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            field_name: field_name.into(),
            data,
        }
    }

    pub fn int64(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, ColumnData::Int64(values))
    }

    pub fn int32(name: impl Into<String>, values: Vec<i32>) -> Self {
        Self::new(name, ColumnData::Int32(values))
    }

    pub fn int16(name: impl Into<String>, values: Vec<i16>) -> Self {
        Self::new(name, ColumnData::Int16(values))
    }

    pub fn int8(name: impl Into<String>, values: Vec<i8>) -> Self {
        Self::new(name, ColumnData::Int8(values))
    }

    pub fn bool(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self::new(name, ColumnData::Bool(values))
    }

    pub fn double(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, ColumnData::Double(values))
    }

    pub fn varchar(name: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(name, ColumnData::VarChar(values))
    }

    pub fn string_array(name: impl Into<String>, values: Vec<Vec<String>>) -> Self {
        Self::new(name, ColumnData::StringArray(values))
    }

    /// Build a vector column from per-row vectors.
    ///
    /// # Errors
    /// Returns `ColumnError::DimensionMismatch` if any row length ≠ `dim`.
    pub fn float_vector(
        name: impl Into<String>,
        dim: usize,
        rows: Vec<Vec<f32>>,
    ) -> Result<Self, ColumnError> {
        let name = name.into();
        let mut values = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(ColumnError::DimensionMismatch {
                    field: name,
                    expected: dim,
                    found: row.len(),
                });
            }
            values.extend(row);
        }
        Ok(Self::new(name, ColumnData::FloatVector { dim, values }))
    }

    /// Build a vector column from an already flattened row-major buffer.
    pub fn float_vector_flat(
        name: impl Into<String>,
        dim: usize,
        values: Vec<f32>,
    ) -> Result<Self, ColumnError> {
        let name = name.into();
        if dim == 0 || values.len() % dim != 0 {
            return Err(ColumnError::RaggedVectors {
                field: name,
                dim,
                values: values.len(),
            });
        }
        Ok(Self::new(name, ColumnData::FloatVector { dim, values }))
    }

    pub fn kind(&self) -> FieldKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check kind and per-value constraints against `field`.
    pub fn check_against(&self, field: &Field) -> Result<(), ColumnError> {
        if self.kind() != field.kind {
            return Err(ColumnError::KindMismatch {
                field: field.name.clone(),
                expected: field.kind,
                found: self.kind(),
            });
        }

        let max_len = field.max_length.map(|m| m as usize).unwrap_or(usize::MAX);
        match &self.data {
            ColumnData::FloatVector { dim, values } => {
                let expected = field.dim.unwrap_or(0) as usize;
                if *dim != expected {
                    return Err(ColumnError::DimensionMismatch {
                        field: field.name.clone(),
                        expected,
                        found: *dim,
                    });
                }
                if *dim == 0 || values.len() % dim != 0 {
                    return Err(ColumnError::RaggedVectors {
                        field: field.name.clone(),
                        dim: *dim,
                        values: values.len(),
                    });
                }
            }
            ColumnData::VarChar(strings) => {
                check_strings(&field.name, strings.iter().enumerate(), max_len)?;
            }
            ColumnData::StringArray(arrays) => {
                let max_cap = field.max_capacity.map(|m| m as usize).unwrap_or(usize::MAX);
                for (row, array) in arrays.iter().enumerate() {
                    if array.len() > max_cap {
                        return Err(ColumnError::ArrayTooLong {
                            field: field.name.clone(),
                            row,
                            len: array.len(),
                            max: max_cap,
                        });
                    }
                    check_strings(&field.name, array.iter().map(|s| (row, s)), max_len)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn check_strings<'a>(
    field: &str,
    strings: impl Iterator<Item = (usize, &'a String)>,
    max: usize,
) -> Result<(), ColumnError> {
    for (row, s) in strings {
        if s.len() > max {
            return Err(ColumnError::StringTooLong {
                field: field.to_string(),
                row,
                len: s.len(),
                max,
            });
        }
    }
    Ok(())
}

// ── Batch Validation ──────────────────────────────────────────────────────────

/// Validate one insert's worth of columns against `schema`.
///
/// The columns must cover every caller-supplied field exactly once, in schema
/// order, with matching kinds and equal row counts. Returns the row count.
pub fn validate_batch(schema: &Schema, columns: &[ColumnBuffer]) -> Result<usize, ColumnError> {
    let mut seen = HashSet::with_capacity(columns.len());
    for col in columns {
        if !seen.insert(col.field_name.as_str()) {
            return Err(ColumnError::DuplicateColumn {
                column: col.field_name.clone(),
            });
        }
    }

    let expected: Vec<&Field> = schema.insert_fields().collect();
    for (position, field) in expected.iter().enumerate() {
        let col = match columns.get(position) {
            Some(col) => col,
            None => {
                return Err(ColumnError::MissingColumn {
                    field: field.name.clone(),
                })
            }
        };
        if col.field_name != field.name {
            if expected.iter().any(|f| f.name == col.field_name) {
                return Err(ColumnError::OutOfOrder {
                    position,
                    expected: field.name.clone(),
                    found: col.field_name.clone(),
                });
            }
            if !seen.contains(field.name.as_str()) {
                return Err(ColumnError::MissingColumn {
                    field: field.name.clone(),
                });
            }
            return Err(ColumnError::UnexpectedColumn {
                column: col.field_name.clone(),
            });
        }
        col.check_against(field)?;
    }
    if let Some(extra) = columns.get(expected.len()) {
        return Err(ColumnError::UnexpectedColumn {
            column: extra.field_name.clone(),
        });
    }

    let rows = columns.first().map(ColumnBuffer::len).unwrap_or(0);
    for col in columns {
        if col.len() != rows {
            return Err(ColumnError::LengthMismatch {
                field: col.field_name.clone(),
                expected: rows,
                found: col.len(),
            });
        }
    }
    Ok(rows)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn schema() -> Schema {
        SchemaBuilder::new("c")
            .field(Field::new("ID", FieldKind::Int64).with_primary_key(true))
            .field(Field::new("address", FieldKind::VarChar).with_max_length(8))
            .field(
                Field::new("tags", FieldKind::StringArray)
                    .with_max_length(4)
                    .with_max_capacity(2),
            )
            .field(Field::new("embeddings", FieldKind::FloatVector).with_dim(2))
            .build()
            .unwrap()
    }

    fn good_columns() -> Vec<ColumnBuffer> {
        vec![
            ColumnBuffer::int64("ID", vec![0, 1]),
            ColumnBuffer::varchar("address", vec!["a0".into(), "a1".into()]),
            ColumnBuffer::string_array("tags", vec![vec!["x".into()], vec![]]),
            ColumnBuffer::float_vector("embeddings", 2, vec![vec![0.1, 0.2], vec![0.3, 0.4]])
                .unwrap(),
        ]
    }

    #[test]
    fn test_valid_batch_returns_row_count() {
        assert_eq!(validate_batch(&schema(), &good_columns()).unwrap(), 2);
    }

    #[test]
    fn test_length_mismatch() {
        let mut cols = good_columns();
        cols[1] = ColumnBuffer::varchar("address", vec!["only".into()]);
        let err = validate_batch(&schema(), &cols).unwrap_err();
        assert_eq!(
            err,
            ColumnError::LengthMismatch {
                field: "address".into(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_order_and_coverage() {
        let mut cols = good_columns();
        cols.swap(1, 2);
        assert!(matches!(
            validate_batch(&schema(), &cols).unwrap_err(),
            ColumnError::OutOfOrder { position: 1, .. }
        ));

        let mut cols = good_columns();
        cols.pop();
        assert!(matches!(
            validate_batch(&schema(), &cols).unwrap_err(),
            ColumnError::MissingColumn { ref field } if field == "embeddings"
        ));

        let mut cols = good_columns();
        cols.push(ColumnBuffer::bool("extra", vec![true, false]));
        assert!(matches!(
            validate_batch(&schema(), &cols).unwrap_err(),
            ColumnError::UnexpectedColumn { .. }
        ));

        let mut cols = good_columns();
        cols.push(ColumnBuffer::int64("ID", vec![0, 1]));
        assert!(matches!(
            validate_batch(&schema(), &cols).unwrap_err(),
            ColumnError::DuplicateColumn { .. }
        ));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut cols = good_columns();
        cols[0] = ColumnBuffer::int32("ID", vec![0, 1]);
        assert!(matches!(
            validate_batch(&schema(), &cols).unwrap_err(),
            ColumnError::KindMismatch {
                expected: FieldKind::Int64,
                found: FieldKind::Int32,
                ..
            }
        ));
    }

    #[test]
    fn test_value_constraints() {
        let mut cols = good_columns();
        cols[1] = ColumnBuffer::varchar("address", vec!["a0".into(), "far too long".into()]);
        assert!(matches!(
            validate_batch(&schema(), &cols).unwrap_err(),
            ColumnError::StringTooLong { row: 1, max: 8, .. }
        ));

        let mut cols = good_columns();
        cols[2] = ColumnBuffer::string_array(
            "tags",
            vec![vec!["a".into(), "b".into(), "c".into()], vec![]],
        );
        assert!(matches!(
            validate_batch(&schema(), &cols).unwrap_err(),
            ColumnError::ArrayTooLong { row: 0, max: 2, .. }
        ));

        let mut cols = good_columns();
        cols[3] = ColumnBuffer::float_vector("embeddings", 3, vec![vec![0.0; 3], vec![0.0; 3]])
            .unwrap();
        assert!(matches!(
            validate_batch(&schema(), &cols).unwrap_err(),
            ColumnError::DimensionMismatch {
                expected: 2,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_float_vector_constructors() {
        let err = ColumnBuffer::float_vector("v", 2, vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, ColumnError::DimensionMismatch { found: 1, .. }));

        let col = ColumnBuffer::float_vector_flat("v", 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(col.len(), 2);
        assert!(ColumnBuffer::float_vector_flat("v", 2, vec![1.0; 3]).is_err());
    }

    #[test]
    fn test_auto_id_column_must_not_be_supplied() {
        let schema = SchemaBuilder::new("c")
            .field(
                Field::new("ID", FieldKind::Int64)
                    .with_primary_key(true)
                    .with_auto_id(true),
            )
            .field(Field::new("embeddings", FieldKind::FloatVector).with_dim(2))
            .build()
            .unwrap();

        let vecs = ColumnBuffer::float_vector_flat("embeddings", 2, vec![0.0; 4]).unwrap();
        assert_eq!(validate_batch(&schema, &[vecs.clone()]).unwrap(), 2);

        let with_id = vec![ColumnBuffer::int64("ID", vec![0, 1]), vecs];
        assert!(validate_batch(&schema, &with_id).is_err());
    }
}
