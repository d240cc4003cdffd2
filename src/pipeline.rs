// VecBase Ingest — pipeline.rs
// End-to-end write path: ensure collection, insert every batch in order,
// flush, build the vector index, load.
// Author: d65v <https://github.com/d65v>
//
// Stages run strictly in that order against a single store connection. A
// failing batch aborts the run; batches already inserted stay committed on
// the store side, there is no rollback and no retry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::column::{validate_batch, ColumnBuffer, ColumnError};
use crate::generator::{materialize, RowGenerator};
use crate::index::IndexSpec;
use crate::planner::{IngestionPlan, RowRange};
use crate::schema::Schema;
use crate::store::StoreClient;
use crate::{IngestConfig, IngestError, Result};

// ── States & Stages ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    SchemaEnsured,
    Inserting,
    Flushed,
    Indexed,
    Loaded,
    Failed,
}

/// Store-facing step a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    EnsureCollection,
    Insert,
    Flush,
    CreateIndex,
    LoadCollection,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::EnsureCollection => "ensure_collection",
            Stage::Insert => "insert",
            Stage::Flush => "flush",
            Stage::CreateIndex => "create_index",
            Stage::LoadCollection => "load_collection",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour when the target collection already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistsPolicy {
    /// Leave the collection untouched and end the run successfully.
    Skip,
    /// Fail with `IngestError::AlreadyExists`.
    Fail,
}

impl FromStr for ExistsPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(ExistsPolicy::Skip),
            "fail" => Ok(ExistsPolicy::Fail),
            other => Err(format!("unknown exists policy '{}' (skip | fail)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    /// Collection was already there and the policy is `Skip`.
    Existing,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub collection: String,
    pub state: PipelineState,
    /// False when the run stopped early on an existing collection.
    pub created: bool,
    pub batches: u64,
    pub rows: u64,
    /// Vector fields an index was built on.
    pub indexed_fields: Vec<String>,
    pub loaded: bool,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct IngestionPipeline {
    schema: Schema,
    plan: IngestionPlan,
    partition_name: String,
    shard_number: u32,
    exists_policy: ExistsPolicy,
    build_index: bool,
    load_collection: bool,
    indexes: Vec<(String, IndexSpec)>,
    state: PipelineState,
}

impl IngestionPipeline {
    /// Pipeline with default options: default partition, one shard, skip an
    /// existing collection, index every vector field with `IndexSpec::default()`
    /// and load.
    pub fn new(schema: Schema, plan: IngestionPlan) -> Self {
        let indexes = schema
            .fields()
            .iter()
            .filter(|f| f.kind.is_vector())
            .map(|f| (f.name.clone(), IndexSpec::default()))
            .collect();
        Self {
            schema,
            plan,
            partition_name: String::new(),
            shard_number: 1,
            exists_policy: ExistsPolicy::Skip,
            build_index: true,
            load_collection: true,
            indexes,
            state: PipelineState::Idle,
        }
    }

    /// Pipeline driven by `config`.
    ///
    /// # Errors
    /// Returns whatever `IngestConfig::validate` rejects.
    pub fn from_config(schema: Schema, config: &IngestConfig) -> Result<Self> {
        config.validate()?;
        let plan = IngestionPlan::new(config.total_rows, config.batch_size)?;
        let spec = config.index_spec();
        let mut pipeline = Self::new(schema, plan)
            .with_partition(config.partition_name.clone())
            .with_shard_number(config.shard_number)
            .with_exists_policy(config.exists_policy)
            .with_build_index(config.build_index)
            .with_load_collection(config.load_collection);
        for entry in &mut pipeline.indexes {
            entry.1 = spec.clone();
        }
        Ok(pipeline)
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition_name = partition.into();
        self
    }

    pub fn with_shard_number(mut self, shard_number: u32) -> Self {
        self.shard_number = shard_number;
        self
    }

    pub fn with_exists_policy(mut self, policy: ExistsPolicy) -> Self {
        self.exists_policy = policy;
        self
    }

    pub fn with_build_index(mut self, build: bool) -> Self {
        self.build_index = build;
        self
    }

    pub fn with_load_collection(mut self, load: bool) -> Self {
        self.load_collection = load;
        self
    }

    /// Index `field` with `spec` instead of the default.
    ///
    /// # Errors
    /// Returns `IngestError::ConfigError` if `field` is not a vector field of
    /// the schema.
    pub fn with_index(mut self, field: &str, spec: IndexSpec) -> Result<Self> {
        match self.indexes.iter_mut().find(|(name, _)| name == field) {
            Some(entry) => entry.1 = spec,
            None => {
                return Err(IngestError::ConfigError(format!(
                    "cannot index '{}': not a vector field of '{}'",
                    field,
                    self.schema.name()
                )))
            }
        }
        Ok(self)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn plan(&self) -> &IngestionPlan {
        &self.plan
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Drive the whole write path. On error the pipeline is left `Failed` and
    /// the error names the stage (and row range, for inserts).
    pub fn run<S, G>(&mut self, store: &mut S, generator: &mut G) -> Result<RunReport>
    where
        S: StoreClient + ?Sized,
        G: RowGenerator + ?Sized,
    {
        self.state = PipelineState::Idle;
        log::info!(
            "ingest '{}': {} rows in {} batches of {}",
            self.schema.name(),
            self.plan.total_rows(),
            self.plan.batch_count(),
            self.plan.batch_size()
        );

        let result = self.drive(store, generator);
        if let Err(e) = &result {
            self.state = PipelineState::Failed;
            log::error!("{}: {}", e, e.root_cause());
        }
        result
    }

    fn drive<S, G>(&mut self, store: &mut S, generator: &mut G) -> Result<RunReport>
    where
        S: StoreClient + ?Sized,
        G: RowGenerator + ?Sized,
    {
        let mut report = RunReport {
            collection: self.schema.name().to_string(),
            state: self.state,
            created: false,
            batches: 0,
            rows: 0,
            indexed_fields: Vec::new(),
            loaded: false,
        };

        if self.ensure_collection(store)? == EnsureOutcome::Existing {
            report.state = self.state;
            return Ok(report);
        }
        report.created = true;

        let (batches, rows) = self.insert_all(store, generator)?;
        report.batches = batches;
        report.rows = rows;

        self.flush(store)?;

        if self.build_index {
            report.indexed_fields = self.build_indexes(store)?;
        } else {
            log::info!("index build disabled, stopping after flush");
        }

        if self.build_index && self.load_collection {
            self.load(store)?;
            report.loaded = true;
        } else if self.load_collection {
            log::warn!("load requested without an index build; skipping load");
        }

        report.state = self.state;
        Ok(report)
    }

    /// Create the collection unless it exists. Running this twice against the
    /// same store issues at most one `create_collection`.
    pub fn ensure_collection<S>(&mut self, store: &mut S) -> Result<EnsureOutcome>
    where
        S: StoreClient + ?Sized,
    {
        let name = self.schema.name();
        let at = |e| IngestError::at_stage(Stage::EnsureCollection, None, e);

        let exists = store.collection_exists(name).map_err(at)?;
        let outcome = if exists {
            match self.exists_policy {
                ExistsPolicy::Skip => {
                    log::warn!("collection '{}' exists, skipping ingest", name);
                    EnsureOutcome::Existing
                }
                ExistsPolicy::Fail => {
                    return Err(at(IngestError::AlreadyExists {
                        name: name.to_string(),
                    }))
                }
            }
        } else {
            log::info!("create collection '{}'", name);
            store
                .create_collection(&self.schema, self.shard_number)
                .map_err(at)?;
            EnsureOutcome::Created
        };

        self.state = PipelineState::SchemaEnsured;
        Ok(outcome)
    }

    fn insert_all<S, G>(&mut self, store: &mut S, generator: &mut G) -> Result<(u64, u64)>
    where
        S: StoreClient + ?Sized,
        G: RowGenerator + ?Sized,
    {
        self.state = PipelineState::Inserting;
        let total = self.plan.total_rows();
        let mut batches = 0u64;
        let mut rows = 0u64;

        for range in self.plan.batches() {
            let columns = self.batch_columns(range, generator)?;
            let written = store
                .insert(self.schema.name(), &self.partition_name, &columns)
                .map_err(|e| IngestError::at_stage(Stage::Insert, Some(range), e))?;

            batches += 1;
            rows += written as u64;
            log::info!("inserted {}/{} rows", range.end, total);
        }
        Ok((batches, rows))
    }

    /// Materialize and validate one batch. Nothing reaches the store if any
    /// column is off.
    fn batch_columns<G>(&self, range: RowRange, generator: &mut G) -> Result<Vec<ColumnBuffer>>
    where
        G: RowGenerator + ?Sized,
    {
        let at = |e| IngestError::at_stage(Stage::Insert, Some(range), e);
        let columns = self
            .schema
            .insert_fields()
            .map(|f| materialize(f, range, generator))
            .collect::<Result<Vec<_>>>()
            .map_err(at)?;

        let rows = validate_batch(&self.schema, &columns).map_err(|e| at(e.into()))?;
        if rows != range.len() {
            let field = columns
                .first()
                .map(|c| c.field_name.clone())
                .unwrap_or_default();
            return Err(at(IngestError::ColumnAlignment(ColumnError::LengthMismatch {
                field,
                expected: range.len(),
                found: rows,
            })));
        }
        Ok(columns)
    }

    fn flush<S>(&mut self, store: &mut S) -> Result<()>
    where
        S: StoreClient + ?Sized,
    {
        log::info!("flush '{}'", self.schema.name());
        store
            .flush(self.schema.name())
            .map_err(|e| IngestError::at_stage(Stage::Flush, None, e))?;
        self.state = PipelineState::Flushed;
        Ok(())
    }

    fn build_indexes<S>(&mut self, store: &mut S) -> Result<Vec<String>>
    where
        S: StoreClient + ?Sized,
    {
        let mut built = Vec::with_capacity(self.indexes.len());
        for (field, spec) in &self.indexes {
            log::info!(
                "create index '{}' on '{}' ({})",
                spec.index_name(field),
                field,
                spec.metric
            );
            store
                .create_index(self.schema.name(), field, spec)
                .map_err(|e| IngestError::at_stage(Stage::CreateIndex, None, e))?;
            built.push(field.clone());
        }
        self.state = PipelineState::Indexed;
        Ok(built)
    }

    fn load<S>(&mut self, store: &mut S) -> Result<()>
    where
        S: StoreClient + ?Sized,
    {
        log::info!("load collection '{}'", self.schema.name());
        store
            .load_collection(self.schema.name())
            .map_err(|e| IngestError::at_stage(Stage::LoadCollection, None, e))?;
        self.state = PipelineState::Loaded;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
