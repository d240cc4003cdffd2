// VecBase Ingest — memory.rs
// In-process store with the target store's consistency rules: inserts land
// in a growing buffer, flush seals them into encoded segments, an index must
// exist on every vector field before the collection can be loaded.
// Author: d65v <https://github.com/d65v>

use std::collections::HashMap;

use crate::column::{validate_batch, ColumnBuffer};
use crate::index::{IndexKind, IndexSpec};
use crate::schema::Schema;
use crate::store::StoreClient;
use crate::{IngestError, Result};

pub const DEFAULT_PARTITION: &str = "_default";
pub const MAX_SHARDS: u32 = 16;

// ── Collection State ──────────────────────────────────────────────────────────

/// A sealed, bincode-encoded run of insert batches.
#[derive(Debug, Clone)]
pub struct Segment {
    pub rows: usize,
    pub bytes: Vec<u8>,
}

impl Segment {
    /// Decode the batches sealed into this segment.
    pub fn batches(&self) -> Result<Vec<Vec<ColumnBuffer>>> {
        bincode::deserialize(&self.bytes).map_err(|e| IngestError::StorageError(e.to_string()))
    }
}

struct Collection {
    schema: Schema,
    shard_number: u32,
    growing: Vec<Vec<ColumnBuffer>>,
    growing_rows: usize,
    segments: Vec<Segment>,
    indexes: HashMap<String, IndexSpec>,
    loaded: bool,
}

impl Collection {
    fn new(schema: Schema, shard_number: u32) -> Self {
        Self {
            schema,
            shard_number,
            growing: Vec::new(),
            growing_rows: 0,
            segments: Vec::new(),
            indexes: HashMap::new(),
            loaded: false,
        }
    }

    fn sealed_rows(&self) -> usize {
        self.segments.iter().map(|s| s.rows).sum()
    }
}

// ── Memory Store ──────────────────────────────────────────────────────────────

pub struct MemoryStore {
    address: String,
    collections: HashMap<String, Collection>,
    closed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            address: "memory".to_string(),
            collections: HashMap::new(),
            closed: false,
        }
    }

    /// "Connect" to `address`. Only the address format is checked.
    ///
    /// # Errors
    /// Returns `IngestError::Transport` for an empty address.
    pub fn connect(address: &str) -> Result<Self> {
        if address.trim().is_empty() {
            return Err(IngestError::Transport("empty store address".to_string()));
        }
        log::info!("connected to in-process store at {}", address);
        Ok(Self {
            address: address.to_string(),
            ..Self::new()
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    pub fn shard_number(&self, name: &str) -> Option<u32> {
        self.collections.get(name).map(|c| c.shard_number)
    }

    /// Rows inserted, flushed or not.
    pub fn row_count(&self, name: &str) -> usize {
        self.collections
            .get(name)
            .map(|c| c.sealed_rows() + c.growing_rows)
            .unwrap_or(0)
    }

    /// Rows sealed by a flush.
    pub fn flushed_rows(&self, name: &str) -> usize {
        self.collections
            .get(name)
            .map(Collection::sealed_rows)
            .unwrap_or(0)
    }

    pub fn segments(&self, name: &str) -> &[Segment] {
        self.collections
            .get(name)
            .map(|c| c.segments.as_slice())
            .unwrap_or(&[])
    }

    pub fn index(&self, collection: &str, field: &str) -> Option<&IndexSpec> {
        self.collections.get(collection)?.indexes.get(field)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.collections.get(name).map(|c| c.loaded).unwrap_or(false)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(IngestError::Transport("connection closed".to_string()));
        }
        Ok(())
    }

    fn collection_mut(&mut self, name: &str) -> Result<&mut Collection> {
        self.ensure_open()?;
        self.collections
            .get_mut(name)
            .ok_or_else(|| IngestError::Transport(format!("collection not found: {}", name)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_index_params(kind: &IndexKind) -> Result<()> {
    match *kind {
        IndexKind::Flat => Ok(()),
        IndexKind::IvfFlat { nlist } if (1..=65_536).contains(&nlist) => Ok(()),
        IndexKind::IvfFlat { nlist } => Err(IngestError::IndexRejected(format!(
            "nlist {} out of range [1, 65536]",
            nlist
        ))),
        IndexKind::Hnsw { m, ef_construction } => {
            if !(4..=64).contains(&m) {
                return Err(IngestError::IndexRejected(format!(
                    "HNSW M {} out of range [4, 64]",
                    m
                )));
            }
            if !(8..=512).contains(&ef_construction) {
                return Err(IngestError::IndexRejected(format!(
                    "HNSW efConstruction {} out of range [8, 512]",
                    ef_construction
                )));
            }
            Ok(())
        }
    }
}

impl StoreClient for MemoryStore {
    fn collection_exists(&mut self, name: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.collections.contains_key(name))
    }

    fn create_collection(&mut self, schema: &Schema, shard_number: u32) -> Result<()> {
        self.ensure_open()?;
        if self.collections.contains_key(schema.name()) {
            return Err(IngestError::AlreadyExists {
                name: schema.name().to_string(),
            });
        }
        if shard_number == 0 || shard_number > MAX_SHARDS {
            return Err(IngestError::SchemaRejected(format!(
                "shard number {} out of range [1, {}]",
                shard_number, MAX_SHARDS
            )));
        }
        log::debug!(
            "create collection '{}' ({} fields, {} shards)",
            schema.name(),
            schema.fields().len(),
            shard_number
        );
        self.collections.insert(
            schema.name().to_string(),
            Collection::new(schema.clone(), shard_number),
        );
        Ok(())
    }

    fn insert(
        &mut self,
        collection: &str,
        partition: &str,
        columns: &[ColumnBuffer],
    ) -> Result<usize> {
        let coll = self.collection_mut(collection)?;
        if !partition.is_empty() && partition != DEFAULT_PARTITION {
            return Err(IngestError::Transport(format!(
                "partition not found: {}",
                partition
            )));
        }
        let rows = validate_batch(&coll.schema, columns)?;
        coll.growing.push(columns.to_vec());
        coll.growing_rows += rows;
        log::debug!("insert {} rows into '{}'", rows, collection);
        Ok(rows)
    }

    fn flush(&mut self, collection: &str) -> Result<()> {
        let coll = self.collection_mut(collection)?;
        if coll.growing.is_empty() {
            return Ok(());
        }
        let bytes = bincode::serialize(&coll.growing)
            .map_err(|e| IngestError::StorageError(e.to_string()))?;
        let rows = coll.growing_rows;
        coll.segments.push(Segment { rows, bytes });
        coll.growing.clear();
        coll.growing_rows = 0;
        log::debug!(
            "flush '{}': sealed {} rows into segment #{}",
            collection,
            rows,
            coll.segments.len()
        );
        Ok(())
    }

    fn create_index(&mut self, collection: &str, field: &str, index: &IndexSpec) -> Result<()> {
        let coll = self.collection_mut(collection)?;
        let target = coll.schema.field(field).ok_or_else(|| {
            IngestError::IndexRejected(format!("field not found: {}", field))
        })?;
        if !target.kind.is_vector() {
            return Err(IngestError::IndexRejected(format!(
                "field '{}' is {}, not a vector field",
                field, target.kind
            )));
        }
        check_index_params(&index.kind)?;

        match coll.indexes.get(field) {
            Some(existing) if existing == index => Ok(()),
            Some(_) => Err(IngestError::IndexRejected(format!(
                "field '{}' already has a different index",
                field
            ))),
            None => {
                log::debug!(
                    "build index '{}' on {}.{} ({})",
                    index.index_name(field),
                    collection,
                    field,
                    index.metric
                );
                coll.indexes.insert(field.to_string(), index.clone());
                Ok(())
            }
        }
    }

    fn load_collection(&mut self, collection: &str) -> Result<()> {
        let coll = self.collection_mut(collection)?;
        if let Some(missing) = coll
            .schema
            .fields()
            .iter()
            .find(|f| f.kind.is_vector() && !coll.indexes.contains_key(&f.name))
        {
            return Err(IngestError::Transport(format!(
                "index not found on vector field '{}'",
                missing.name
            )));
        }
        coll.loaded = true;
        log::debug!("loaded '{}'", collection);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{materialize, RandomRowGenerator};
    use crate::planner::RowRange;
    use crate::presets;

    fn batch(schema: &Schema, range: RowRange) -> Vec<ColumnBuffer> {
        let mut g = RandomRowGenerator::seeded(3);
        schema
            .insert_fields()
            .map(|f| materialize(f, range, &mut g).unwrap())
            .collect()
    }

    #[test]
    fn test_create_twice_already_exists() {
        let schema = presets::few_fields("c", 4).unwrap();
        let mut store = MemoryStore::new();
        store.create_collection(&schema, 1).unwrap();
        let err = store.create_collection(&schema, 1).unwrap_err();
        assert!(matches!(err, IngestError::AlreadyExists { .. }));
    }

    #[test]
    fn test_shard_bounds() {
        let schema = presets::few_fields("c", 4).unwrap();
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.create_collection(&schema, 0).unwrap_err(),
            IngestError::SchemaRejected(_)
        ));
        assert!(store.create_collection(&schema, MAX_SHARDS + 1).is_err());
    }

    #[test]
    fn test_insert_flush_seals_segment() {
        let schema = presets::array_fields("c", 3).unwrap();
        let mut store = MemoryStore::new();
        store.create_collection(&schema, 1).unwrap();

        store.insert("c", "", &batch(&schema, RowRange::new(0, 10))).unwrap();
        store.insert("c", DEFAULT_PARTITION, &batch(&schema, RowRange::new(10, 15))).unwrap();
        assert_eq!(store.row_count("c"), 15);
        assert_eq!(store.flushed_rows("c"), 0);

        store.flush("c").unwrap();
        assert_eq!(store.flushed_rows("c"), 15);
        assert_eq!(store.segments("c").len(), 1);

        let sealed = store.segments("c")[0].batches().unwrap();
        assert_eq!(sealed.len(), 2);
        assert_eq!(sealed[1][0].len(), 5);

        // nothing pending: no new segment
        store.flush("c").unwrap();
        assert_eq!(store.segments("c").len(), 1);
    }

    #[test]
    fn test_insert_rejects_misaligned_columns() {
        let schema = presets::few_fields("c", 4).unwrap();
        let mut store = MemoryStore::new();
        store.create_collection(&schema, 1).unwrap();
        let mut cols = batch(&schema, RowRange::new(0, 4));
        cols.reverse();
        let err = store.insert("c", "", &cols).unwrap_err();
        assert!(matches!(err, IngestError::ColumnAlignment(_)));
        assert_eq!(store.row_count("c"), 0);
    }

    #[test]
    fn test_unknown_collection_and_partition() {
        let schema = presets::few_fields("c", 4).unwrap();
        let mut store = MemoryStore::new();
        assert!(matches!(store.flush("c").unwrap_err(), IngestError::Transport(_)));

        store.create_collection(&schema, 1).unwrap();
        let err = store
            .insert("c", "p1", &batch(&schema, RowRange::new(0, 2)))
            .unwrap_err();
        assert!(matches!(err, IngestError::Transport(_)));
    }

    #[test]
    fn test_index_rules() {
        let schema = presets::few_fields("c", 4).unwrap();
        let mut store = MemoryStore::new();
        store.create_collection(&schema, 1).unwrap();

        let spec = IndexSpec::default();
        assert!(matches!(
            store.create_index("c", "address", &spec).unwrap_err(),
            IngestError::IndexRejected(_)
        ));
        assert!(matches!(
            store
                .create_index("c", "embeddings", &IndexSpec::hnsw(spec.metric, 2, 50))
                .unwrap_err(),
            IngestError::IndexRejected(_)
        ));

        store.create_index("c", "embeddings", &spec).unwrap();
        store.create_index("c", "embeddings", &spec).unwrap();
        assert_eq!(store.index("c", "embeddings"), Some(&spec));
    }

    #[test]
    fn test_load_requires_index() {
        let schema = presets::few_fields("c", 4).unwrap();
        let mut store = MemoryStore::new();
        store.create_collection(&schema, 1).unwrap();
        assert!(matches!(
            store.load_collection("c").unwrap_err(),
            IngestError::Transport(_)
        ));
        store.create_index("c", "embeddings", &IndexSpec::default()).unwrap();
        store.load_collection("c").unwrap();
        assert!(store.is_loaded("c"));
    }

    #[test]
    fn test_closed_store_refuses_calls() {
        let mut store = MemoryStore::connect("127.0.0.1:19530").unwrap();
        assert_eq!(store.address(), "127.0.0.1:19530");
        store.close();
        assert!(store.is_closed());
        assert!(store.collection_exists("c").is_err());
        assert!(MemoryStore::connect("").is_err());
    }
}
