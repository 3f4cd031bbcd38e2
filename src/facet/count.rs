//! Facet count values and aggregated facet results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A facet value together with the number of matching documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    /// The facet value.
    pub value: String,
    /// Number of matching documents carrying this value.
    pub count: u64,
}

impl FacetCount {
    /// Create a new facet count.
    pub fn new<S: Into<String>>(value: S, count: u64) -> Self {
        FacetCount {
            value: value.into(),
            count,
        }
    }
}

/// Facet counts produced by one partition, keyed by field name.
pub type FacetCounts = HashMap<String, Vec<FacetCount>>;

/// Aggregated facet counts keyed by field, each field's values sorted and
/// truncated per its spec.
///
/// Results are immutable snapshots; they are built once by aggregation and
/// only read afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacetResults {
    field_facets: HashMap<String, Vec<FacetCount>>,
}

impl FacetResults {
    /// Create empty facet results.
    pub fn empty() -> Self {
        FacetResults {
            field_facets: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, field: String, counts: Vec<FacetCount>) {
        self.field_facets.insert(field, counts);
    }

    /// Get the sorted facet counts for a field.
    pub fn facets(&self, field: &str) -> Option<&[FacetCount]> {
        self.field_facets.get(field).map(|counts| counts.as_slice())
    }

    /// Iterate over the fields that have facet counts.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.field_facets.keys().map(|field| field.as_str())
    }

    /// Get the number of fields with facet counts.
    pub fn len(&self) -> usize {
        self.field_facets.len()
    }

    /// Check if no field has facet counts.
    pub fn is_empty(&self) -> bool {
        self.field_facets.is_empty()
    }
}
