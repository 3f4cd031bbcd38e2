//! Partition reader traits for query execution.
//!
//! Sagitta does not build or own indexes; it executes against any engine
//! that can answer the questions these traits ask. Hosts implement
//! [`SegmentReader`] once per index partition.

use std::sync::Arc;

use bit_vec::BitVec;

use crate::error::{Result, SagittaError};

/// Trait for reading one index partition.
pub trait SegmentReader: Send + Sync + std::fmt::Debug {
    /// Get the number of documents in the partition (one past the highest
    /// document ID).
    fn max_doc(&self) -> u64;

    /// Check if a document is live (not deleted).
    fn is_live(&self, doc_id: u64) -> bool;

    /// Get the positions of a term within a document, or `None` if the
    /// document does not contain the term.
    fn positions(
        &self,
        field: &str,
        term: &str,
        doc_id: u64,
    ) -> Result<Option<Box<dyn PositionIterator>>>;
}

/// Iterator over the positions of one term in one document.
pub trait PositionIterator: Send + std::fmt::Debug {
    /// Get the number of positions recorded for the term in this document.
    fn term_freq(&self) -> u64;

    /// Move to the next position and return it.
    fn next_position(&mut self) -> Result<u64>;

    /// Get the payload bytes attached to the current position, if any.
    fn payload(&self) -> Option<&[u8]>;
}

/// Basic in-memory position iterator over (position, payload) pairs.
#[derive(Debug)]
pub struct BasicPositionIterator {
    positions: Vec<(u64, Option<Vec<u8>>)>,
    current: Option<usize>,
}

impl BasicPositionIterator {
    /// Create a new iterator over positions sorted in increasing order.
    pub fn new(positions: Vec<(u64, Option<Vec<u8>>)>) -> Self {
        BasicPositionIterator {
            positions,
            current: None,
        }
    }
}

impl PositionIterator for BasicPositionIterator {
    fn term_freq(&self) -> u64 {
        self.positions.len() as u64
    }

    fn next_position(&mut self) -> Result<u64> {
        let next = match self.current {
            Some(index) => index + 1,
            None => 0,
        };
        if next >= self.positions.len() {
            return Err(SagittaError::index("position iterator exhausted"));
        }
        self.current = Some(next);
        Ok(self.positions[next].0)
    }

    fn payload(&self) -> Option<&[u8]> {
        let index = self.current?;
        self.positions[index].1.as_deref()
    }
}

/// Random-access acceptance test over a document ID space.
///
/// Out-of-range indexes answer `false`.
pub trait Bits: Send + Sync + std::fmt::Debug {
    /// Check if the bit at `index` is set.
    fn get(&self, index: u64) -> bool;
}

impl Bits for BitVec {
    fn get(&self, index: u64) -> bool {
        BitVec::get(self, index as usize).unwrap_or(false)
    }
}

/// Acceptance test backed by a partition reader's liveness check.
#[derive(Debug, Clone)]
pub struct LiveDocsBits {
    reader: Arc<dyn SegmentReader>,
}

impl LiveDocsBits {
    /// Create a liveness test over the given reader.
    pub fn new(reader: Arc<dyn SegmentReader>) -> Self {
        LiveDocsBits { reader }
    }
}

impl Bits for LiveDocsBits {
    fn get(&self, index: u64) -> bool {
        index < self.reader.max_doc() && self.reader.is_live(index)
    }
}
