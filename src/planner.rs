// VecBase Ingest — planner.rs
// Splits a row count into fixed-size half-open batch ranges.
// Author: d65v <https://github.com/d65v>

use std::fmt;
use std::iter::FusedIterator;

use serde::Serialize;

use crate::{IngestError, Result};

/// Half-open row interval `[start, end)` over the logical row-id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RowRange {
    pub start: u64,
    pub end: u64,
}

impl RowRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(end >= start, "RowRange: end {} < start {}", end, start);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Row ids covered by this range.
    pub fn rows(&self) -> std::ops::Range<u64> {
        self.start..self.end
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Immutable batching plan for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestionPlan {
    total_rows: u64,
    batch_size: u64,
}

impl IngestionPlan {
    /// Plan `total_rows` rows in batches of `batch_size`.
    ///
    /// # Errors
    /// Returns `IngestError::InvalidPlan` if `batch_size == 0`.
    pub fn new(total_rows: u64, batch_size: u64) -> Result<Self> {
        if batch_size == 0 {
            return Err(IngestError::InvalidPlan(
                "batch size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            total_rows,
            batch_size,
        })
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// `ceil(total_rows / batch_size)`
    pub fn batch_count(&self) -> u64 {
        self.total_rows.div_ceil(self.batch_size)
    }

    /// Range of batch `index`, or `None` past the end.
    pub fn range(&self, index: u64) -> Option<RowRange> {
        if index >= self.batch_count() {
            return None;
        }
        let start = index * self.batch_size;
        // start < total_rows, so this cannot overflow
        let end = start + (self.total_rows - start).min(self.batch_size);
        Some(RowRange::new(start, end))
    }

    /// Lazy sequence of batch ranges. Each call starts from batch 0.
    pub fn batches(&self) -> Batches {
        Batches {
            plan: *self,
            next: 0,
        }
    }
}

impl IntoIterator for &IngestionPlan {
    type Item = RowRange;
    type IntoIter = Batches;

    fn into_iter(self) -> Batches {
        self.batches()
    }
}

/// Iterator over the ranges of an [`IngestionPlan`].
#[derive(Debug, Clone)]
pub struct Batches {
    plan: IngestionPlan,
    next: u64,
}

impl Iterator for Batches {
    type Item = RowRange;

    fn next(&mut self) -> Option<RowRange> {
        let range = self.plan.range(self.next)?;
        self.next += 1;
        Some(range)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.plan.batch_count().saturating_sub(self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Batches {}

impl FusedIterator for Batches {}

/// Shorthand for `IngestionPlan::new(total_rows, batch_size)`.
pub fn plan(total_rows: u64, batch_size: u64) -> Result<IngestionPlan> {
    IngestionPlan::new(total_rows, batch_size)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uneven_last_batch() {
        let p = plan(10_005, 1_000).unwrap();
        let ranges: Vec<RowRange> = p.batches().collect();
        assert_eq!(p.batch_count(), 11);
        assert_eq!(ranges.len(), 11);
        assert_eq!(ranges[0], RowRange::new(0, 1_000));
        assert_eq!(ranges[9], RowRange::new(9_000, 10_000));
        assert_eq!(ranges[10], RowRange::new(10_000, 10_005));
    }

    #[test]
    fn test_even_batches() {
        let p = plan(500, 100).unwrap();
        let ranges: Vec<RowRange> = p.batches().collect();
        assert_eq!(ranges.len(), 5);
        assert!(ranges.iter().all(|r| r.len() == 100));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = plan(10, 0).unwrap_err();
        assert!(matches!(err, IngestError::InvalidPlan(_)));
    }

    #[test]
    fn test_empty_dataset() {
        let p = plan(0, 100).unwrap();
        assert_eq!(p.batch_count(), 0);
        assert_eq!(p.batches().next(), None);
    }

    #[test]
    fn test_ranges_partition_the_dataset() {
        let cases = [
            (1, 1),
            (7, 3),
            (999, 1_000),
            (1_000, 1_000),
            (12_345, 678),
            (u64::MAX, u64::MAX / 2 + 1),
        ];
        for &(total, size) in &cases {
            let p = plan(total, size).unwrap();
            let ranges: Vec<RowRange> = p.batches().collect();

            let mut expected_start = 0;
            for r in &ranges {
                assert_eq!(r.start, expected_start, "gap or overlap in {}/{}", total, size);
                assert!(r.end > r.start);
                assert!(r.len() as u64 <= size);
                expected_start = r.end;
            }
            assert_eq!(expected_start, total);

            let last = ranges.last().unwrap();
            assert_eq!(last.len() as u64, total - (p.batch_count() - 1) * size);
        }
    }

    #[test]
    fn test_batches_restartable_and_exact_size() {
        let p = plan(2_500, 1_000).unwrap();
        let mut it = p.batches();
        assert_eq!(it.len(), 3);
        it.next();
        assert_eq!(it.len(), 2);

        let first: Vec<RowRange> = p.batches().collect();
        let second: Vec<RowRange> = (&p).into_iter().collect();
        assert_eq!(first, second);
    }
}
