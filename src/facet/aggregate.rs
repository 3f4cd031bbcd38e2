//! Cross-partition facet count aggregation.

use ahash::AHashMap;

use crate::error::Result;
use crate::facet::count::{FacetCount, FacetCounts, FacetResults};
use crate::facet::spec::{FacetSpec, FacetSpecProvider};

/// Merge per-partition facet counts into one sorted, truncated result set.
///
/// Counts for identical values are summed across partitions; a value absent
/// from a partition contributes nothing for that partition, and no value
/// absent from every partition is fabricated. Each field is then sorted
/// with the comparator its spec selects and truncated to the spec's
/// `max_count`. Fields without a configured spec use the default spec.
pub fn merge_facet_counts(
    partitions: &[FacetCounts],
    specs: &dyn FacetSpecProvider,
) -> Result<FacetResults> {
    let mut summed: AHashMap<&str, AHashMap<&str, u64>> = AHashMap::new();

    for partition in partitions {
        for (field, counts) in partition {
            let field_counts = summed.entry(field.as_str()).or_default();
            for facet in counts {
                *field_counts.entry(facet.value.as_str()).or_insert(0) += facet.count;
            }
        }
    }

    let default_spec = FacetSpec::default();
    let mut results = FacetResults::empty();

    for (field, value_counts) in summed {
        let spec = specs.facet_spec(field).unwrap_or(&default_spec);
        let comparator = spec.comparator()?;

        let mut merged: Vec<FacetCount> = value_counts
            .into_iter()
            .map(|(value, count)| FacetCount::new(value, count))
            .collect();
        merged.sort_by(|a, b| comparator.compare(a, b));

        if spec.max_count > 0 && merged.len() > spec.max_count {
            merged.truncate(spec.max_count);
        }

        results.insert(field.to_string(), merged);
    }

    Ok(results)
}
