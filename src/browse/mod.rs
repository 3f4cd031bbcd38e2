//! Browse requests, per-partition results and cross-partition merging.

pub mod multi;

pub use self::multi::{BrowseConfig, MultiBrowser, Partition};

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::facet::aggregate::merge_facet_counts;
use crate::facet::count::{FacetCounts, FacetResults};
use crate::facet::spec::{FacetSpec, FacetSpecProvider};
use crate::query::facet_term::FacetTermQuery;
use crate::util::merge::merge_lists;

/// A single browse hit: a globally addressed document and its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowseHit {
    /// The global document ID.
    pub doc_id: u64,
    /// The relevance score.
    pub score: f32,
}

impl BrowseHit {
    /// Create a new browse hit.
    pub fn new(doc_id: u64, score: f32) -> Self {
        BrowseHit { doc_id, score }
    }
}

/// Compare hits by score descending, breaking ties by document ID ascending.
pub fn compare_hits(a: &BrowseHit, b: &BrowseHit) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.doc_id.cmp(&b.doc_id))
}

/// A browse request: the facet query to execute plus pagination and the
/// facet specs to aggregate under.
#[derive(Debug, Clone)]
pub struct BrowseRequest {
    /// The facet query to execute.
    pub query: FacetTermQuery,
    /// Number of leading hits to skip.
    pub offset: usize,
    /// Maximum number of hits to return.
    pub count: usize,
    /// Per-field facet specs for aggregation.
    pub facet_specs: HashMap<String, FacetSpec>,
}

impl BrowseRequest {
    /// Create a request returning the first `count` hits.
    pub fn new(query: FacetTermQuery, count: usize) -> Self {
        BrowseRequest {
            query,
            offset: 0,
            count,
            facet_specs: HashMap::new(),
        }
    }

    /// Set the pagination offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Register a facet spec for a field.
    pub fn with_facet_spec<S: Into<String>>(mut self, field: S, spec: FacetSpec) -> Self {
        self.facet_specs.insert(field.into(), spec);
        self
    }
}

/// One partition's contribution to a browse: its top hits sorted by
/// [`compare_hits`], its facet counts, and its total match count.
#[derive(Debug, Clone, Default)]
pub struct PartitionResult {
    /// Top hits of the partition, globally addressed, sorted by score.
    pub hits: Vec<BrowseHit>,
    /// Facet counts of the partition.
    pub facets: FacetCounts,
    /// Total matches in the partition, not limited by pagination.
    pub total_hits: u64,
}

/// The merged outcome of a browse across all partitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseResult {
    /// Total matches across partitions, not limited by pagination.
    pub total_hits: u64,
    /// The requested page of hits, ordered by score.
    pub hits: Vec<BrowseHit>,
    /// Aggregated facet counts.
    pub facets: FacetResults,
}

/// Merge per-partition browse results into the requested page.
///
/// Hits are merged in score order and paginated with `offset`/`count`,
/// facet counts are aggregated under `specs`, and totals are summed.
pub fn merge_browse_results(
    offset: usize,
    count: usize,
    partitions: Vec<PartitionResult>,
    specs: &dyn FacetSpecProvider,
) -> Result<BrowseResult> {
    let mut total_hits = 0;
    let mut facet_counts = Vec::with_capacity(partitions.len());
    let mut hit_lists = Vec::with_capacity(partitions.len());
    for partition in partitions {
        total_hits += partition.total_hits;
        facet_counts.push(partition.facets);
        hit_lists.push(partition.hits.into_iter());
    }

    let facets = merge_facet_counts(&facet_counts, specs)?;
    let hits = merge_lists(offset, count, hit_lists, compare_hits);

    Ok(BrowseResult {
        total_hits,
        hits,
        facets,
    })
}
