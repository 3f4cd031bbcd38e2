//! Facet output specs: sort order, truncation, and the shared comparators.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SagittaError};
use crate::facet::count::FacetCount;
use crate::util::merge::Comparator;

/// Sort order of a field's aggregated facet values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacetSortOrder {
    /// Sort by facet value, ascending.
    ValueAsc,
    /// Sort by hit count descending, breaking ties by value ascending.
    HitsDesc,
    /// Sort with a caller-supplied comparator.
    Custom,
}

impl Default for FacetSortOrder {
    fn default() -> Self {
        FacetSortOrder::ValueAsc
    }
}

/// Factory producing comparators for [`FacetSortOrder::Custom`].
pub trait ComparatorFactory: Send + Sync {
    /// Create the comparator.
    fn comparator(&self) -> Arc<dyn Comparator<FacetCount>>;
}

/// Comparator ordering facets by value, ascending.
///
/// When both compared values start with `'-'` the relative order is
/// reversed; a marker on only one side leaves the plain string order
/// untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacetValueComparator;

impl Comparator<FacetCount> for FacetValueComparator {
    fn compare(&self, a: &FacetCount, b: &FacetCount) -> Ordering {
        let ordering = a.value.cmp(&b.value);
        if a.value.starts_with('-') && b.value.starts_with('-') {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Comparator ordering facets by hit count descending, ties by value
/// ascending.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacetHitsComparator;

impl Comparator<FacetCount> for FacetHitsComparator {
    fn compare(&self, a: &FacetCount, b: &FacetCount) -> Ordering {
        b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value))
    }
}

/// Output spec for one facet field: how its aggregated values are ordered
/// and how many are kept.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct FacetSpec {
    /// Sort order for the field's values.
    pub order: FacetSortOrder,
    /// Maximum number of values kept after sorting; 0 keeps all.
    pub max_count: usize,
    /// Comparator factory used when `order` is [`FacetSortOrder::Custom`].
    #[serde(skip)]
    pub custom_comparator: Option<Arc<dyn ComparatorFactory>>,
}

impl FacetSpec {
    /// Create a spec with the given sort order and no truncation.
    pub fn new(order: FacetSortOrder) -> Self {
        FacetSpec {
            order,
            max_count: 0,
            custom_comparator: None,
        }
    }

    /// Set the maximum number of values kept after sorting.
    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// Use a custom comparator, switching the order to
    /// [`FacetSortOrder::Custom`].
    pub fn with_custom_comparator(mut self, factory: Arc<dyn ComparatorFactory>) -> Self {
        self.order = FacetSortOrder::Custom;
        self.custom_comparator = Some(factory);
        self
    }

    /// Select the comparator this spec sorts with.
    pub fn comparator(&self) -> Result<Arc<dyn Comparator<FacetCount>>> {
        match self.order {
            FacetSortOrder::ValueAsc => Ok(Arc::new(FacetValueComparator)),
            FacetSortOrder::HitsDesc => Ok(Arc::new(FacetHitsComparator)),
            FacetSortOrder::Custom => match &self.custom_comparator {
                Some(factory) => Ok(factory.comparator()),
                None => Err(SagittaError::facet(
                    "custom facet sort order without a comparator factory",
                )),
            },
        }
    }
}

impl fmt::Debug for FacetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacetSpec")
            .field("order", &self.order)
            .field("max_count", &self.max_count)
            .field("custom_comparator", &self.custom_comparator.is_some())
            .finish()
    }
}

/// Source of per-field facet specs.
pub trait FacetSpecProvider: Send + Sync {
    /// Get the spec for a field, if one is configured.
    fn facet_spec(&self, field: &str) -> Option<&FacetSpec>;
}

impl<S: BuildHasher + Send + Sync> FacetSpecProvider for HashMap<String, FacetSpec, S> {
    fn facet_spec(&self, field: &str) -> Option<&FacetSpec> {
        self.get(field)
    }
}
