// VecBase Ingest — lib.rs
// Public API, error types, configuration, re-exports.
// Author: d65v <https://github.com/d65v>

pub mod column;
pub mod generator;
pub mod index;
pub mod memory;
pub mod pipeline;
pub mod planner;
pub mod presets;
pub mod schema;
pub mod store;

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

pub use crate::column::{validate_batch, ColumnBuffer, ColumnData, ColumnError};
pub use crate::generator::{materialize, RandomRowGenerator, RowGenerator};
pub use crate::index::{IndexKind, IndexSpec, Metric};
pub use crate::memory::MemoryStore;
pub use crate::pipeline::{
    EnsureOutcome, ExistsPolicy, IngestionPipeline, PipelineState, RunReport, Stage,
};
pub use crate::planner::{plan, IngestionPlan, RowRange};
pub use crate::presets::Preset;
pub use crate::schema::{Field, FieldKind, Schema, SchemaBuilder, SchemaError};
pub use crate::store::{CallLog, RecordingStore, Session, StoreCall, StoreClient};

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Column alignment error: {0}")]
    ColumnAlignment(#[from] ColumnError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Schema rejected by store: {0}")]
    SchemaRejected(String),

    #[error("Index rejected by store: {0}")]
    IndexRejected(String),

    #[error("Collection already exists: {name}")]
    AlreadyExists { name: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Ingest failed at stage '{}'{}", .stage, range_suffix(.range))]
    Stage {
        stage: Stage,
        range: Option<RowRange>,
        #[source]
        source: Box<IngestError>,
    },
}

fn range_suffix(range: &Option<RowRange>) -> String {
    match range {
        Some(r) => format!(" (rows {})", r),
        None => String::new(),
    }
}

impl IngestError {
    pub fn at_stage(stage: Stage, range: Option<RowRange>, source: IngestError) -> Self {
        IngestError::Stage {
            stage,
            range,
            source: Box::new(source),
        }
    }

    /// Stage the error was raised in, if it went through the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            IngestError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Row range of the failing batch, for insert-stage failures.
    pub fn range(&self) -> Option<RowRange> {
        match self {
            IngestError::Stage { range, .. } => *range,
            _ => None,
        }
    }

    /// Innermost error, with stage wrappers peeled off.
    pub fn root_cause(&self) -> &IngestError {
        match self {
            IngestError::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Store endpoint, `host:port`
    pub address: String,
    /// Target collection
    pub collection_name: String,
    /// Partition to insert into; empty means the default partition
    pub partition_name: String,
    /// Shards requested at collection creation
    pub shard_number: u32,
    /// Rows to generate and insert
    pub total_rows: u64,
    /// Rows per insert call
    pub batch_size: u64,
    /// Dimensionality of the embedding column
    pub dim: u32,
    /// Schema shape to ingest
    pub preset: Preset,
    /// Similarity metric of the vector index
    pub metric: String,
    /// What to do when the collection is already there
    pub exists_policy: ExistsPolicy,
    pub build_index: bool,
    pub load_collection: bool,
    /// Fixed RNG seed for reproducible data
    pub seed: Option<u64>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            address: "localhost:19530".to_string(),
            collection_name: "hello_ingest".to_string(),
            partition_name: String::new(),
            shard_number: 1,
            total_rows: 10_005,
            batch_size: 1_000,
            dim: 64,
            preset: Preset::Few,
            metric: "cosine".to_string(),
            exists_policy: ExistsPolicy::Skip,
            build_index: true,
            load_collection: true,
            seed: None,
        }
    }
}

impl IngestConfig {
    /// Load config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            address: std::env::var("INGEST_ADDRESS").unwrap_or(d.address),
            collection_name: std::env::var("INGEST_COLLECTION").unwrap_or(d.collection_name),
            partition_name: std::env::var("INGEST_PARTITION").unwrap_or(d.partition_name),
            shard_number: env_parse("INGEST_SHARDS", d.shard_number),
            total_rows: env_parse("INGEST_TOTAL_ROWS", d.total_rows),
            batch_size: env_parse("INGEST_BATCH_SIZE", d.batch_size),
            dim: env_parse("INGEST_DIM", d.dim),
            preset: env_parse("INGEST_SCHEMA", d.preset),
            metric: std::env::var("INGEST_METRIC").unwrap_or(d.metric),
            exists_policy: env_parse("INGEST_EXISTS_POLICY", d.exists_policy),
            build_index: env_parse("INGEST_BUILD_INDEX", d.build_index),
            load_collection: env_parse("INGEST_LOAD", d.load_collection),
            seed: env_parse_opt("INGEST_SEED").or(d.seed),
        }
    }

    /// Load config from a JSON file; missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| IngestError::ConfigError(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| IngestError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Reject settings no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.collection_name.trim().is_empty() {
            return Err(IngestError::ConfigError("collection name is empty".into()));
        }
        if self.address.trim().is_empty() {
            return Err(IngestError::ConfigError("store address is empty".into()));
        }
        if self.batch_size == 0 {
            return Err(IngestError::InvalidPlan(
                "batch size must be greater than zero".into(),
            ));
        }
        if self.dim == 0 {
            return Err(IngestError::ConfigError("dim must be greater than zero".into()));
        }
        if self.shard_number == 0 {
            return Err(IngestError::ConfigError(
                "shard number must be greater than zero".into(),
            ));
        }
        if self.load_collection && !self.build_index {
            return Err(IngestError::ConfigError(
                "loading a collection requires building its vector index".into(),
            ));
        }
        Ok(())
    }

    /// Index spec for the selected preset, with the configured metric.
    pub fn index_spec(&self) -> IndexSpec {
        IndexSpec {
            metric: Metric::parse(&self.metric),
            ..self.preset.index_spec()
        }
    }

    /// Preset schema named after the configured collection.
    pub fn schema(&self) -> Result<Schema> {
        Ok(self.preset.schema(&self.collection_name, self.dim)?)
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env_parse_opt(key).unwrap_or(default)
}

/// Parsed value of `key`; `None` if unset or unparsable (the latter warns).
fn env_parse_opt<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("{}: cannot parse '{}', using default", key, raw);
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
