// VecBase Ingest — store.rs
// The store capability the pipeline drives, a call recorder, and the
// session guard that owns an open connection.
// Author: d65v <https://github.com/d65v>

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::column::ColumnBuffer;
use crate::index::IndexSpec;
use crate::schema::Schema;
use crate::Result;

// ── Store Capability ──────────────────────────────────────────────────────────

/// Remote operations the ingest pipeline needs from a vector store.
///
/// Implementations own the transport. Request deadlines, if any, apply per
/// call; the pipeline itself never times out.
pub trait StoreClient {
    fn collection_exists(&mut self, name: &str) -> Result<bool>;

    fn create_collection(&mut self, schema: &Schema, shard_number: u32) -> Result<()>;

    /// Insert one batch. `columns` follow schema order. Returns rows written.
    fn insert(&mut self, collection: &str, partition: &str, columns: &[ColumnBuffer])
        -> Result<usize>;

    /// Seal everything inserted so far into durable segments.
    fn flush(&mut self, collection: &str) -> Result<()>;

    fn create_index(&mut self, collection: &str, field: &str, index: &IndexSpec) -> Result<()>;

    /// Make the collection servable for queries.
    fn load_collection(&mut self, collection: &str) -> Result<()>;

    /// Release the connection. Called once by [`Session`].
    fn close(&mut self) {}
}

impl<S: StoreClient + ?Sized> StoreClient for &mut S {
    fn collection_exists(&mut self, name: &str) -> Result<bool> {
        (**self).collection_exists(name)
    }

    fn create_collection(&mut self, schema: &Schema, shard_number: u32) -> Result<()> {
        (**self).create_collection(schema, shard_number)
    }

    fn insert(
        &mut self,
        collection: &str,
        partition: &str,
        columns: &[ColumnBuffer],
    ) -> Result<usize> {
        (**self).insert(collection, partition, columns)
    }

    fn flush(&mut self, collection: &str) -> Result<()> {
        (**self).flush(collection)
    }

    fn create_index(&mut self, collection: &str, field: &str, index: &IndexSpec) -> Result<()> {
        (**self).create_index(collection, field, index)
    }

    fn load_collection(&mut self, collection: &str) -> Result<()> {
        (**self).load_collection(collection)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

// ── Session Guard ─────────────────────────────────────────────────────────────

/// Owns an open store connection for the life of a run and closes it on
/// drop, whichever way the run ends.
pub struct Session<S: StoreClient> {
    store: S,
    closed: bool,
}

impl<S: StoreClient> Session<S> {
    pub fn open(store: S) -> Self {
        log::debug!("store session opened");
        Self {
            store,
            closed: false,
        }
    }

    /// Close now instead of at drop.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.store.close();
            log::debug!("store session closed");
        }
    }
}

impl<S: StoreClient> Deref for Session<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.store
    }
}

impl<S: StoreClient> DerefMut for Session<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

impl<S: StoreClient> Drop for Session<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Call Recording ────────────────────────────────────────────────────────────

/// One store call as issued by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreCall {
    CollectionExists {
        collection: String,
    },
    CreateCollection {
        collection: String,
        shard_number: u32,
        fields: Vec<String>,
    },
    Insert {
        collection: String,
        partition: String,
        columns: Vec<String>,
        rows: usize,
    },
    Flush {
        collection: String,
    },
    CreateIndex {
        collection: String,
        field: String,
        index: IndexSpec,
    },
    LoadCollection {
        collection: String,
    },
    Close,
}

impl StoreCall {
    /// Short operation name, e.g. `"insert"`.
    pub fn op(&self) -> &'static str {
        match self {
            StoreCall::CollectionExists { .. } => "collection_exists",
            StoreCall::CreateCollection { .. } => "create_collection",
            StoreCall::Insert { .. } => "insert",
            StoreCall::Flush { .. } => "flush",
            StoreCall::CreateIndex { .. } => "create_index",
            StoreCall::LoadCollection { .. } => "load_collection",
            StoreCall::Close => "close",
        }
    }
}

/// Shared, cloneable log of store calls. Survives the store it records.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<StoreCall>>>);

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Vec<StoreCall>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, call: StoreCall) {
        self.lock().push(call);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().clone()
    }

    /// Operation names in call order.
    pub fn ops(&self) -> Vec<&'static str> {
        self.lock().iter().map(StoreCall::op).collect()
    }

    pub fn count(&self, op: &str) -> usize {
        self.lock().iter().filter(|c| c.op() == op).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Wraps a store and records every call before forwarding it.
pub struct RecordingStore<S> {
    inner: S,
    log: CallLog,
}

impl<S: StoreClient> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            log: CallLog::default(),
        }
    }

    /// Handle onto the call log; stays valid after the store is dropped.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: StoreClient> StoreClient for RecordingStore<S> {
    fn collection_exists(&mut self, name: &str) -> Result<bool> {
        self.log.push(StoreCall::CollectionExists {
            collection: name.to_string(),
        });
        self.inner.collection_exists(name)
    }

    fn create_collection(&mut self, schema: &Schema, shard_number: u32) -> Result<()> {
        self.log.push(StoreCall::CreateCollection {
            collection: schema.name().to_string(),
            shard_number,
            fields: schema.fields().iter().map(|f| f.name.clone()).collect(),
        });
        self.inner.create_collection(schema, shard_number)
    }

    fn insert(
        &mut self,
        collection: &str,
        partition: &str,
        columns: &[ColumnBuffer],
    ) -> Result<usize> {
        self.log.push(StoreCall::Insert {
            collection: collection.to_string(),
            partition: partition.to_string(),
            columns: columns.iter().map(|c| c.field_name.clone()).collect(),
            rows: columns.first().map(ColumnBuffer::len).unwrap_or(0),
        });
        self.inner.insert(collection, partition, columns)
    }

    fn flush(&mut self, collection: &str) -> Result<()> {
        self.log.push(StoreCall::Flush {
            collection: collection.to_string(),
        });
        self.inner.flush(collection)
    }

    fn create_index(&mut self, collection: &str, field: &str, index: &IndexSpec) -> Result<()> {
        self.log.push(StoreCall::CreateIndex {
            collection: collection.to_string(),
            field: field.to_string(),
            index: index.clone(),
        });
        self.inner.create_index(collection, field, index)
    }

    fn load_collection(&mut self, collection: &str) -> Result<()> {
        self.log.push(StoreCall::LoadCollection {
            collection: collection.to_string(),
        });
        self.inner.load_collection(collection)
    }

    fn close(&mut self) {
        self.log.push(StoreCall::Close);
        self.inner.close();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
