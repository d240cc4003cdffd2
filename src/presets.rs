// VecBase Ingest — presets.rs
// Ready-made collection shapes: a handful of scalar columns, the full set of
// scalar kinds, and a string-array column.
// Author: d65v <https://github.com/d65v>

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::index::{IndexSpec, Metric};
use crate::schema::{Field, FieldKind, Schema, SchemaBuilder, SchemaError};

pub const ID_COL: &str = "ID";
pub const RANDOM_COL: &str = "random";
pub const ADDRESS_COL: &str = "address";
pub const EMBEDDING_COL: &str = "embeddings";

/// Primary key, a double, a short varchar and one vector column.
pub fn few_fields(name: &str, dim: u32) -> Result<Schema, SchemaError> {
    SchemaBuilder::new(name)
        .description("few scalar fields plus one embedding")
        .field(id_field())
        .field(Field::new(RANDOM_COL, FieldKind::Double))
        .field(Field::new(ADDRESS_COL, FieldKind::VarChar).with_max_length(50))
        .field(embedding_field(dim))
        .build()
}

/// Every scalar kind the store accepts, plus one vector column.
pub fn mass_fields(name: &str, dim: u32) -> Result<Schema, SchemaError> {
    SchemaBuilder::new(name)
        .description("one column per scalar kind plus one embedding")
        .field(id_field())
        .field(Field::new(RANDOM_COL, FieldKind::Double))
        .field(Field::new(ADDRESS_COL, FieldKind::VarChar).with_max_length(50))
        .field(Field::new("bool", FieldKind::Bool))
        .field(Field::new("int8", FieldKind::Int8))
        .field(Field::new("int16", FieldKind::Int16))
        .field(Field::new("int32", FieldKind::Int32))
        .field(embedding_field(dim))
        .build()
}

/// Primary key, an array of up to 10 strings and one vector column.
pub fn array_fields(name: &str, dim: u32) -> Result<Schema, SchemaError> {
    SchemaBuilder::new(name)
        .description("string array field plus one embedding")
        .field(id_field())
        .field(
            Field::new(RANDOM_COL, FieldKind::StringArray)
                .with_max_length(1000)
                .with_max_capacity(10),
        )
        .field(embedding_field(dim))
        .build()
}

fn id_field() -> Field {
    Field::new(ID_COL, FieldKind::Int64)
        .with_primary_key(true)
        .with_auto_id(false)
}

fn embedding_field(dim: u32) -> Field {
    Field::new(EMBEDDING_COL, FieldKind::FloatVector).with_dim(dim)
}

// ── Preset Selector ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Few,
    Mass,
    Array,
}

impl Preset {
    pub fn schema(&self, name: &str, dim: u32) -> Result<Schema, SchemaError> {
        match self {
            Preset::Few => few_fields(name, dim),
            Preset::Mass => mass_fields(name, dim),
            Preset::Array => array_fields(name, dim),
        }
    }

    /// Index the preset's embedding column is built with.
    pub fn index_spec(&self) -> IndexSpec {
        match self {
            Preset::Few | Preset::Mass => IndexSpec::hnsw(Metric::Cosine, 15, 50),
            Preset::Array => IndexSpec::hnsw(Metric::Cosine, 8, 64),
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "few" | "fewfields" => Ok(Preset::Few),
            "mass" | "massfields" => Ok(Preset::Mass),
            "array" | "arr" | "arrfields" => Ok(Preset::Array),
            other => Err(format!("unknown schema preset '{}' (few | mass | array)", other)),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Preset::Few => "few",
            Preset::Mass => "mass",
            Preset::Array => "array",
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_build() {
        assert_eq!(few_fields("c", 64).unwrap().fields().len(), 4);
        assert_eq!(mass_fields("c", 64).unwrap().fields().len(), 8);
        let arr = array_fields("c", 5).unwrap();
        assert_eq!(arr.field(RANDOM_COL).unwrap().max_capacity, Some(10));
    }

    #[test]
    fn test_presets_reject_zero_dim() {
        assert!(few_fields("c", 0).is_err());
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!("MASS".parse::<Preset>().unwrap(), Preset::Mass);
        assert_eq!("arrfields".parse::<Preset>().unwrap(), Preset::Array);
        assert!("nope".parse::<Preset>().is_err());
        assert_eq!(Preset::Array.to_string(), "array");
    }
}
