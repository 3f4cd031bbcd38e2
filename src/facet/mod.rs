//! Facet model: selections, specs, counts, handlers, and aggregation.

pub mod aggregate;
pub mod count;
pub mod handler;
pub mod selection;
pub mod spec;

pub use self::aggregate::merge_facet_counts;
pub use self::count::{FacetCount, FacetCounts, FacetResults};
pub use self::handler::{
    BitDocSet, DocScorer, FacetCountCollector, FacetHandler, FacetHandlerLookup, HashDocSet,
    RandomAccessDocSet,
};
pub use self::selection::{FacetSelection, SelectionOperation};
pub use self::spec::{
    ComparatorFactory, FacetHitsComparator, FacetSortOrder, FacetSpec, FacetSpecProvider,
    FacetValueComparator,
};
