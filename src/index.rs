// VecBase Ingest — index.rs
// Index descriptions handed to the store after the final flush.
// Author: d65v <https://github.com/d65v>
//
// The ingest core never looks inside an IndexSpec; the store validates the
// parameters and builds the structure server-side.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported similarity metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Cosine similarity
    Cosine,
    /// Euclidean (L2) distance
    L2,
    /// Raw inner product
    InnerProduct,
}

impl Metric {
    /// Parse a metric name, falling back to cosine for unknown input.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Metric::L2,
            "ip" | "dot" | "inner_product" => Metric::InnerProduct,
            _ => Metric::Cosine,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Metric::Cosine => "COSINE",
            Metric::L2 => "L2",
            Metric::InnerProduct => "IP",
        })
    }
}

/// Index algorithm and its build parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Brute-force scan, no build parameters.
    Flat,
    /// Inverted file with `nlist` clusters.
    IvfFlat { nlist: u32 },
    /// Proximity graph: `m` neighbors per node, `ef_construction` build beam.
    Hnsw { m: u32, ef_construction: u32 },
}

/// Complete index request for one vector field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub kind: IndexKind,
    pub metric: Metric,
    /// Explicit index name; `None` means `idx_<field>`.
    #[serde(default)]
    pub name: Option<String>,
}

impl IndexSpec {
    pub fn hnsw(metric: Metric, m: u32, ef_construction: u32) -> Self {
        Self {
            kind: IndexKind::Hnsw { m, ef_construction },
            metric,
            name: None,
        }
    }

    pub fn flat(metric: Metric) -> Self {
        Self {
            kind: IndexKind::Flat,
            metric,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name the index will be registered under for `field`.
    pub fn index_name(&self, field: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("idx_{}", field))
    }
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self::hnsw(Metric::Cosine, 15, 50)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_hnsw_cosine() {
        let spec = IndexSpec::default();
        assert_eq!(spec.metric, Metric::Cosine);
        assert_eq!(
            spec.kind,
            IndexKind::Hnsw {
                m: 15,
                ef_construction: 50
            }
        );
    }

    #[test]
    fn test_index_name() {
        assert_eq!(IndexSpec::default().index_name("embeddings"), "idx_embeddings");
        let named = IndexSpec::flat(Metric::L2).with_name("vec_idx");
        assert_eq!(named.index_name("embeddings"), "vec_idx");
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!(Metric::parse("euclidean"), Metric::L2);
        assert_eq!(Metric::parse("IP"), Metric::InnerProduct);
        assert_eq!(Metric::parse("whatever"), Metric::Cosine);
    }
}
