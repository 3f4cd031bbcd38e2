//! Facet handler seams and membership doc sets.
//!
//! Facet handlers are owned by the host engine; Sagitta consumes them
//! through [`FacetHandlerLookup`] when building facet query scorers and
//! when collecting per-partition facet counts. Scoring and counting are
//! optional capabilities a handler may or may not expose.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;

use ahash::AHashSet;
use bit_vec::BitVec;

use crate::error::Result;
use crate::facet::count::FacetCount;
use crate::facet::selection::FacetSelection;
use crate::facet::spec::FacetSpec;
use crate::query::explain::Explanation;
use crate::query::scoring::{BoostMap, ScoringFunctionFactory};
use crate::reader::SegmentReader;

/// Random-access membership test over a partition's documents.
pub trait RandomAccessDocSet: Send + Sync + std::fmt::Debug {
    /// Check if the document is a member.
    fn contains(&self, doc_id: u64) -> bool;
}

/// Membership set backed by a bit vector, for dense sets.
#[derive(Debug, Clone)]
pub struct BitDocSet {
    bits: BitVec,
}

impl BitDocSet {
    /// Create a doc set from a bit vector.
    pub fn new(bits: BitVec) -> Self {
        BitDocSet { bits }
    }

    /// Create a doc set containing the given documents.
    pub fn from_doc_ids(max_doc: u64, doc_ids: &[u64]) -> Self {
        let mut bits = BitVec::from_elem(max_doc as usize, false);
        for &doc_id in doc_ids {
            if doc_id < max_doc {
                bits.set(doc_id as usize, true);
            }
        }
        BitDocSet { bits }
    }
}

impl RandomAccessDocSet for BitDocSet {
    fn contains(&self, doc_id: u64) -> bool {
        self.bits.get(doc_id as usize).unwrap_or(false)
    }
}

/// Membership set backed by a hash set, for sparse sets.
#[derive(Debug, Clone, Default)]
pub struct HashDocSet {
    doc_ids: AHashSet<u64>,
}

impl HashDocSet {
    /// Create a doc set containing the given documents.
    pub fn from_doc_ids(doc_ids: &[u64]) -> Self {
        HashDocSet {
            doc_ids: doc_ids.iter().copied().collect(),
        }
    }
}

impl RandomAccessDocSet for HashDocSet {
    fn contains(&self, doc_id: u64) -> bool {
        self.doc_ids.contains(&doc_id)
    }
}

/// Per-document scorer bound to a boost map, produced by a scoreable facet
/// handler.
pub trait DocScorer: Send + std::fmt::Debug {
    /// Score one document.
    fn score(&mut self, doc_id: u64) -> f32;

    /// Explain the score of one document.
    fn explain(&self, doc_id: u64) -> Explanation;
}

/// Collector accumulating facet value counts over matched documents of one
/// partition.
pub trait FacetCountCollector: Send {
    /// Count one matched document.
    fn collect(&mut self, doc_id: u64);

    /// Get the accumulated counts.
    fn facets(&self) -> Vec<FacetCount>;
}

/// A facet handler: the host engine's implementation of one facet field.
///
/// `doc_set` is the required capability; scoring and counting are optional
/// and absent by default.
pub trait FacetHandler: Send + Sync + std::fmt::Debug {
    /// Get the facet field name this handler serves.
    fn name(&self) -> &str;

    /// Build a random-access membership set for a selection, or `None` if
    /// the selection does not constrain this partition.
    ///
    /// Fails when the handler cannot operate against the partition's
    /// representation.
    fn doc_set(
        &self,
        selection: &FacetSelection,
        reader: &dyn SegmentReader,
    ) -> Result<Option<Arc<dyn RandomAccessDocSet>>>;

    /// Bind a per-document scorer to a boost map, if this handler supports
    /// scoring.
    fn doc_scorer(
        &self,
        reader: &dyn SegmentReader,
        scoring_factory: &dyn ScoringFunctionFactory,
        boosts: &BoostMap,
    ) -> Option<Box<dyn DocScorer>> {
        let _ = (reader, scoring_factory, boosts);
        None
    }

    /// Create a facet count collector, if this handler supports counting.
    fn count_collector(
        &self,
        reader: &dyn SegmentReader,
        spec: &FacetSpec,
    ) -> Option<Box<dyn FacetCountCollector>> {
        let _ = (reader, spec);
        None
    }
}

/// Lookup of facet handlers by field name.
pub trait FacetHandlerLookup: Send + Sync + std::fmt::Debug {
    /// Get the handler registered for a field.
    fn handler_for(&self, field: &str) -> Option<Arc<dyn FacetHandler>>;
}

impl<S: BuildHasher + Send + Sync> FacetHandlerLookup
    for HashMap<String, Arc<dyn FacetHandler>, S>
{
    fn handler_for(&self, field: &str) -> Option<Arc<dyn FacetHandler>> {
        self.get(field).cloned()
    }
}
