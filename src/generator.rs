// VecBase Ingest — generator.rs
// Row sources: the RowGenerator seam, column materialization and a
// schema-aware random generator for synthetic loads.
// Author: d65v <https://github.com/d65v>

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::column::{ColumnBuffer, ColumnData, ColumnError};
use crate::planner::RowRange;
use crate::schema::{Field, FieldKind};
use crate::Result;

/// Produces column values for a range of rows.
///
/// Implementations must return exactly `range.len()` rows typed according to
/// `field.kind`; the pipeline validates every batch before inserting it.
pub trait RowGenerator {
    fn generate(&mut self, field: &Field, range: RowRange) -> Result<ColumnData>;
}

/// Produce the column buffer for `field` over `range`.
pub fn materialize<G: RowGenerator + ?Sized>(
    field: &Field,
    range: RowRange,
    source: &mut G,
) -> Result<ColumnBuffer> {
    let data = source.generate(field, range)?;
    Ok(ColumnBuffer::new(field.name.clone(), data))
}

// ── Random Generator ──────────────────────────────────────────────────────────

/// Fills every field kind with random values that satisfy the field's
/// constraints. The primary key is the row id.
pub struct RandomRowGenerator {
    rng: StdRng,
    varchar_prefix: String,
}

impl RandomRowGenerator {
    /// Seeded generator; identical seeds give identical datasets.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            varchar_prefix: "row_".to_string(),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            varchar_prefix: "row_".to_string(),
        }
    }

    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(s),
            None => Self::from_entropy(),
        }
    }

    pub fn with_varchar_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.varchar_prefix = prefix.into();
        self
    }

    fn uuid_string(&mut self) -> String {
        let bytes: [u8; 16] = self.rng.gen();
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string()
    }
}

impl RowGenerator for RandomRowGenerator {
    fn generate(&mut self, field: &Field, range: RowRange) -> Result<ColumnData> {
        let n = range.len();
        let max_len = field.max_length.unwrap_or(u32::MAX) as usize;

        let data = match field.kind {
            FieldKind::Int64 if field.is_primary_key => {
                ColumnData::Int64(range.rows().map(|r| r as i64).collect())
            }
            FieldKind::Int64 => ColumnData::Int64((0..n).map(|_| self.rng.gen()).collect()),
            FieldKind::Int32 => ColumnData::Int32((0..n).map(|_| self.rng.gen()).collect()),
            FieldKind::Int16 => ColumnData::Int16((0..n).map(|_| self.rng.gen()).collect()),
            FieldKind::Int8 => ColumnData::Int8((0..n).map(|_| self.rng.gen()).collect()),
            FieldKind::Bool => ColumnData::Bool((0..n).map(|_| self.rng.gen_bool(0.5)).collect()),
            FieldKind::Double => ColumnData::Double((0..n).map(|_| self.rng.gen()).collect()),
            FieldKind::VarChar if field.is_primary_key => {
                // truncating would collide keys, so refuse ids that don't fit
                let keys: Vec<String> = range.rows().map(|r| r.to_string()).collect();
                let too_long = keys.iter().enumerate().find(|(_, k)| k.len() > max_len);
                if let Some((row, key)) = too_long {
                    return Err(ColumnError::StringTooLong {
                        field: field.name.clone(),
                        row,
                        len: key.len(),
                        max: max_len,
                    }
                    .into());
                }
                ColumnData::VarChar(keys)
            }
            FieldKind::VarChar => ColumnData::VarChar(
                range
                    .rows()
                    .map(|r| truncate_utf8(format!("{}{}", self.varchar_prefix, r), max_len))
                    .collect(),
            ),
            FieldKind::FloatVector => {
                let dim = field.dim.unwrap_or(0) as usize;
                ColumnData::FloatVector {
                    dim,
                    values: (0..n * dim).map(|_| self.rng.gen::<f32>()).collect(),
                }
            }
            FieldKind::StringArray => {
                let cap = field.max_capacity.unwrap_or(0) as usize;
                let rows = (0..n)
                    .map(|_| {
                        (0..cap)
                            .map(|_| truncate_utf8(self.uuid_string(), max_len))
                            .collect()
                    })
                    .collect();
                ColumnData::StringArray(rows)
            }
        };
        Ok(data)
    }
}

/// Cut `s` to at most `max` bytes on a char boundary.
fn truncate_utf8(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    s
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::validate_batch;
    use crate::presets;

    #[test]
    fn test_primary_key_follows_row_ids() {
        let mut g = RandomRowGenerator::seeded(7);
        let pk = Field::new("ID", FieldKind::Int64).with_primary_key(true);
        let col = materialize(&pk, RowRange::new(1_000, 1_003), &mut g).unwrap();
        assert_eq!(col.data, ColumnData::Int64(vec![1_000, 1_001, 1_002]));
        assert_eq!(col.field_name, "ID");
    }

    #[test]
    fn test_every_preset_generates_valid_batches() {
        for schema in [
            presets::few_fields("few", 16).unwrap(),
            presets::mass_fields("mass", 16).unwrap(),
            presets::array_fields("arr", 5).unwrap(),
        ] {
            let mut g = RandomRowGenerator::seeded(42);
            let range = RowRange::new(10, 35);
            let cols: Vec<ColumnBuffer> = schema
                .insert_fields()
                .map(|f| materialize(f, range, &mut g).unwrap())
                .collect();
            assert_eq!(validate_batch(&schema, &cols).unwrap(), 25, "{}", schema.name());
        }
    }

    #[test]
    fn test_string_arrays_fill_capacity_within_length() {
        let field = Field::new("tags", FieldKind::StringArray)
            .with_max_length(8)
            .with_max_capacity(3);
        let mut g = RandomRowGenerator::seeded(1);
        match g.generate(&field, RowRange::new(0, 4)).unwrap() {
            ColumnData::StringArray(rows) => {
                assert_eq!(rows.len(), 4);
                assert!(rows.iter().all(|r| r.len() == 3));
                assert!(rows.iter().flatten().all(|s| s.len() == 8));
            }
            other => panic!("unexpected column {:?}", other.kind()),
        }
    }

    #[test]
    fn test_varchar_primary_key_never_truncated() {
        let pk = Field::new("ID", FieldKind::VarChar)
            .with_max_length(1)
            .with_primary_key(true);
        let mut g = RandomRowGenerator::seeded(3);

        let col = materialize(&pk, RowRange::new(7, 10), &mut g).unwrap();
        assert_eq!(
            col.data,
            ColumnData::VarChar(vec!["7".into(), "8".into(), "9".into()])
        );

        let err = materialize(&pk, RowRange::new(10, 13), &mut g).unwrap_err();
        assert!(matches!(
            err,
            crate::IngestError::ColumnAlignment(ColumnError::StringTooLong {
                row: 0,
                len: 2,
                max: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_same_seed_same_data() {
        let field = Field::new("embeddings", FieldKind::FloatVector).with_dim(4);
        let range = RowRange::new(0, 10);
        let a = RandomRowGenerator::seeded(9).generate(&field, range).unwrap();
        let b = RandomRowGenerator::seeded(9).generate(&field, range).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate_utf8("hello".into(), 3), "hel");
        assert_eq!(truncate_utf8("héllo".into(), 2), "h");
        assert_eq!(truncate_utf8("ok".into(), 10), "ok");
    }
}
