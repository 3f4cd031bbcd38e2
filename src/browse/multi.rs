//! Multi-partition browser: parallel per-partition evaluation plus merging.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;

use log::warn;
use parking_lot::RwLock;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::browse::{
    BrowseHit, BrowseRequest, BrowseResult, PartitionResult, compare_hits, merge_browse_results,
};
use crate::error::{Result, SagittaError};
use crate::facet::count::FacetCounts;
use crate::facet::handler::FacetHandlerLookup;
use crate::query::matcher::Matcher;
use crate::reader::{Bits, LiveDocsBits, SegmentReader};

/// Configuration for a [`MultiBrowser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseConfig {
    /// Thread pool size for partition evaluation.
    /// If None, uses the number of CPU cores.
    pub thread_pool_size: Option<usize>,

    /// Whether to continue when individual partitions fail. A browse in
    /// which every partition fails still fails.
    pub allow_partial_results: bool,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            thread_pool_size: None,
            allow_partial_results: false,
        }
    }
}

/// One browseable partition: a segment reader plus the facet handlers
/// registered for it, keyed by name in the browser's registry.
#[derive(Debug, Clone)]
pub struct Partition {
    name: String,
    reader: Arc<dyn SegmentReader>,
    handlers: Arc<dyn FacetHandlerLookup>,
}

impl Partition {
    /// Create a partition from a name, a reader, and its handler lookup.
    pub fn new<S: Into<String>>(
        name: S,
        reader: Arc<dyn SegmentReader>,
        handlers: Arc<dyn FacetHandlerLookup>,
    ) -> Self {
        Partition {
            name: name.into(),
            reader,
            handlers,
        }
    }

    /// Get the partition's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the partition's reader.
    pub fn reader(&self) -> &Arc<dyn SegmentReader> {
        &self.reader
    }

    /// Get the partition's facet handler lookup.
    pub fn handlers(&self) -> &Arc<dyn FacetHandlerLookup> {
        &self.handlers
    }
}

/// Browses any number of partitions and merges their results.
///
/// Partitions are evaluated in parallel on a dedicated thread pool.
/// Document IDs in merged results are global: each partition's IDs are
/// offset by the cumulative max-doc of the partitions registered before it.
pub struct MultiBrowser {
    config: BrowseConfig,
    partitions: RwLock<Vec<Partition>>,
    thread_pool: ThreadPool,
}

impl fmt::Debug for MultiBrowser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiBrowser")
            .field("config", &self.config)
            .field("partitions", &self.partitions.read().len())
            .finish()
    }
}

impl MultiBrowser {
    /// Create a new multi browser.
    pub fn new(config: BrowseConfig) -> Result<Self> {
        let thread_pool_size = config.thread_pool_size.unwrap_or_else(num_cpus::get);

        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(thread_pool_size)
            .thread_name(|i| format!("browse-{i}"))
            .build()
            .map_err(|e| SagittaError::other(format!("Failed to create thread pool: {e}")))?;

        Ok(Self {
            config,
            partitions: RwLock::new(Vec::new()),
            thread_pool,
        })
    }

    /// Add a partition. Its documents follow all previously added
    /// partitions in the global document ID order.
    ///
    /// Fails when a partition with the same name is already registered.
    pub fn add_partition(&self, partition: Partition) -> Result<()> {
        let mut partitions = self.partitions.write();
        if partitions.iter().any(|p| p.name == partition.name) {
            return Err(SagittaError::index(format!(
                "partition '{}' already registered",
                partition.name
            )));
        }
        partitions.push(partition);
        Ok(())
    }

    /// Remove a partition by name and return it. The partitions after it
    /// shift down in the global document ID order.
    ///
    /// Fails when no partition with the name is registered.
    pub fn remove_partition(&self, name: &str) -> Result<Partition> {
        let mut partitions = self.partitions.write();
        match partitions.iter().position(|p| p.name == name) {
            Some(index) => Ok(partitions.remove(index)),
            None => Err(SagittaError::index(format!("partition '{name}' not found"))),
        }
    }

    /// Get the number of partitions.
    pub fn partition_count(&self) -> usize {
        self.partitions.read().len()
    }

    /// Total number of documents across all partitions.
    pub fn max_doc(&self) -> u64 {
        self.partitions
            .read()
            .iter()
            .map(|partition| partition.reader.max_doc())
            .sum()
    }

    /// Execute a browse across every partition and merge the results.
    ///
    /// A failing partition fails the whole browse unless
    /// [`BrowseConfig::allow_partial_results`] is set, in which case it is
    /// logged and skipped. A browse in which every partition fails still
    /// fails.
    pub fn browse(&self, request: &BrowseRequest) -> Result<BrowseResult> {
        let partitions = self.partitions.read().clone();

        // Each partition's documents are offset by the max-doc sum of the
        // partitions before it.
        let mut doc_bases = Vec::with_capacity(partitions.len());
        let mut doc_base = 0u64;
        for partition in &partitions {
            doc_bases.push(doc_base);
            doc_base += partition.reader.max_doc();
        }

        let outcomes: Vec<Result<PartitionResult>> = self.thread_pool.install(|| {
            partitions
                .par_iter()
                .enumerate()
                .map(|(index, partition)| browse_partition(partition, doc_bases[index], request))
                .collect()
        });

        let had_partitions = !outcomes.is_empty();
        let mut results = Vec::with_capacity(outcomes.len());
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) if self.config.allow_partial_results => {
                    warn!(
                        "partition '{}' failed during browse: {e}",
                        partitions[index].name
                    );
                }
                Err(e) => return Err(e),
            }
        }
        if had_partitions && results.is_empty() {
            return Err(SagittaError::facet("all partitions failed during browse"));
        }

        merge_browse_results(request.offset, request.count, results, &request.facet_specs)
    }
}

/// Browse one partition: iterate the query's matches, keep the top
/// `offset + count` hits, and feed every match to the partition's facet
/// count collectors.
fn browse_partition(
    partition: &Partition,
    doc_base: u64,
    request: &BrowseRequest,
) -> Result<PartitionResult> {
    let reader = partition.reader.as_ref();
    let accept_docs: Arc<dyn Bits> = Arc::new(LiveDocsBits::new(Arc::clone(&partition.reader)));
    let mut scorer = request
        .query
        .scorer(reader, partition.handlers.as_ref(), Some(accept_docs))?;

    let mut collectors = Vec::new();
    for (field, spec) in &request.facet_specs {
        if let Some(handler) = partition.handlers.handler_for(field) {
            if let Some(collector) = handler.count_collector(reader, spec) {
                collectors.push((field.clone(), collector));
            }
        }
    }

    let mut top_hits = TopHits::new(request.offset.saturating_add(request.count));
    let mut total_hits = 0u64;

    while !scorer.is_exhausted() {
        let doc_id = scorer.doc_id();
        let score = scorer.score();
        total_hits += 1;
        top_hits.insert(BrowseHit::new(doc_base + doc_id, score));
        for (_, collector) in &mut collectors {
            collector.collect(doc_id);
        }
        scorer.next()?;
    }

    let mut facets = FacetCounts::new();
    for (field, collector) in collectors {
        facets.insert(field, collector.facets());
    }

    Ok(PartitionResult {
        hits: top_hits.into_sorted_hits(),
        facets,
        total_hits,
    })
}

/// Bounded collector keeping the best `keep` hits per [`compare_hits`].
struct TopHits {
    keep: usize,
    heap: BinaryHeap<HeapHit>,
}

/// Heap entry ordered so the heap's greatest element is the worst kept hit.
struct HeapHit(BrowseHit);

impl PartialEq for HeapHit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapHit {}

impl PartialOrd for HeapHit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapHit {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_hits(&self.0, &other.0)
    }
}

impl TopHits {
    fn new(keep: usize) -> Self {
        TopHits {
            keep,
            heap: BinaryHeap::new(),
        }
    }

    fn insert(&mut self, hit: BrowseHit) {
        if self.keep == 0 {
            return;
        }
        if self.heap.len() < self.keep {
            self.heap.push(HeapHit(hit));
            return;
        }
        if let Some(worst) = self.heap.peek() {
            if compare_hits(&hit, &worst.0) == Ordering::Less {
                self.heap.pop();
                self.heap.push(HeapHit(hit));
            }
        }
    }

    fn into_sorted_hits(self) -> Vec<BrowseHit> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|hit| hit.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::facet::count::FacetCount;
    use crate::facet::handler::{
        BitDocSet, DocScorer, FacetCountCollector, FacetHandler, RandomAccessDocSet,
    };
    use crate::facet::selection::FacetSelection;
    use crate::facet::spec::{FacetSortOrder, FacetSpec};
    use crate::query::explain::Explanation;
    use crate::query::facet_term::FacetTermQuery;
    use crate::query::scoring::{BoostMap, ScoringFunction, ScoringFunctionFactory};
    use crate::reader::PositionIterator;

    #[derive(Debug)]
    struct TestReader {
        values: Vec<Option<&'static str>>,
        deleted: Vec<u64>,
    }

    impl SegmentReader for TestReader {
        fn max_doc(&self) -> u64 {
            self.values.len() as u64
        }

        fn is_live(&self, doc_id: u64) -> bool {
            !self.deleted.contains(&doc_id)
        }

        fn positions(
            &self,
            _field: &str,
            _term: &str,
            _doc_id: u64,
        ) -> Result<Option<Box<dyn PositionIterator>>> {
            Ok(None)
        }
    }

    #[derive(Debug)]
    struct ColorScorer {
        values: Vec<Option<&'static str>>,
        boosts: BoostMap,
        function: Box<dyn ScoringFunction>,
    }

    impl DocScorer for ColorScorer {
        fn score(&mut self, doc_id: u64) -> f32 {
            self.function.clear();
            if let Some(Some(value)) = self.values.get(doc_id as usize).copied() {
                self.function.collect(1, self.boosts.boost(value));
            }
            self.function.current_score()
        }

        fn explain(&self, doc_id: u64) -> Explanation {
            match self.values.get(doc_id as usize).copied() {
                Some(Some(value)) => self.function.explain(1, self.boosts.boost(value)),
                _ => self.function.explain_combined(&[]),
            }
        }
    }

    struct ColorCollector {
        values: Vec<Option<&'static str>>,
        counts: HashMap<&'static str, u64>,
    }

    impl FacetCountCollector for ColorCollector {
        fn collect(&mut self, doc_id: u64) {
            if let Some(Some(value)) = self.values.get(doc_id as usize).copied() {
                *self.counts.entry(value).or_insert(0) += 1;
            }
        }

        fn facets(&self) -> Vec<FacetCount> {
            self.counts
                .iter()
                .map(|(&value, &count)| FacetCount::new(value, count))
                .collect()
        }
    }

    #[derive(Debug)]
    struct ColorHandler {
        values: Vec<Option<&'static str>>,
    }

    impl FacetHandler for ColorHandler {
        fn name(&self) -> &str {
            "color"
        }

        fn doc_set(
            &self,
            selection: &FacetSelection,
            _reader: &dyn SegmentReader,
        ) -> Result<Option<Arc<dyn RandomAccessDocSet>>> {
            let doc_ids: Vec<u64> = self
                .values
                .iter()
                .enumerate()
                .filter_map(|(doc_id, value)| match value {
                    Some(v) if selection.values.iter().any(|s| s == *v) => Some(doc_id as u64),
                    _ => None,
                })
                .collect();
            Ok(Some(Arc::new(BitDocSet::from_doc_ids(
                self.values.len() as u64,
                &doc_ids,
            ))))
        }

        fn doc_scorer(
            &self,
            _reader: &dyn SegmentReader,
            scoring_factory: &dyn ScoringFunctionFactory,
            boosts: &BoostMap,
        ) -> Option<Box<dyn DocScorer>> {
            Some(Box::new(ColorScorer {
                values: self.values.clone(),
                boosts: boosts.clone(),
                function: scoring_factory.scoring_function(1, self.values.len() as u64),
            }))
        }

        fn count_collector(
            &self,
            _reader: &dyn SegmentReader,
            _spec: &FacetSpec,
        ) -> Option<Box<dyn FacetCountCollector>> {
            Some(Box::new(ColorCollector {
                values: self.values.clone(),
                counts: HashMap::new(),
            }))
        }
    }

    #[derive(Debug)]
    struct FailingHandler;

    impl FacetHandler for FailingHandler {
        fn name(&self) -> &str {
            "color"
        }

        fn doc_set(
            &self,
            _selection: &FacetSelection,
            _reader: &dyn SegmentReader,
        ) -> Result<Option<Arc<dyn RandomAccessDocSet>>> {
            Err(SagittaError::index("partition representation not supported"))
        }
    }

    fn partition(name: &str, values: Vec<Option<&'static str>>, deleted: Vec<u64>) -> Partition {
        let reader = Arc::new(TestReader {
            values: values.clone(),
            deleted,
        });
        let mut handlers: HashMap<String, Arc<dyn FacetHandler>> = HashMap::new();
        handlers.insert("color".to_string(), Arc::new(ColorHandler { values }));
        Partition::new(name, reader, Arc::new(handlers))
    }

    fn failing_partition(max_doc: usize) -> Partition {
        let reader = Arc::new(TestReader {
            values: vec![None; max_doc],
            deleted: Vec::new(),
        });
        let mut handlers: HashMap<String, Arc<dyn FacetHandler>> = HashMap::new();
        handlers.insert("color".to_string(), Arc::new(FailingHandler));
        Partition::new("broken", reader, Arc::new(handlers))
    }

    fn red_request(count: usize) -> BrowseRequest {
        let query = FacetTermQuery::new(
            FacetSelection::new("color").add_value("red"),
            BoostMap::new().with_boost("red", 2.0),
        );
        BrowseRequest::new(query, count)
            .with_facet_spec("color", FacetSpec::new(FacetSortOrder::HitsDesc))
    }

    #[test]
    fn test_browser_creation() {
        let browser = MultiBrowser::new(BrowseConfig::default()).unwrap();

        assert_eq!(browser.partition_count(), 0);
        assert_eq!(browser.max_doc(), 0);
    }

    #[test]
    fn test_empty_browse() {
        let browser = MultiBrowser::new(BrowseConfig::default()).unwrap();

        let result = browser.browse(&red_request(10)).unwrap();

        assert_eq!(result.total_hits, 0);
        assert!(result.hits.is_empty());
        assert!(result.facets.is_empty());
    }

    #[test]
    fn test_partition_management() {
        let browser = MultiBrowser::new(BrowseConfig::default()).unwrap();

        browser.add_partition(partition("p1", vec![Some("red"), None], Vec::new())).unwrap();
        browser.add_partition(partition("p2", vec![Some("blue")], Vec::new())).unwrap();
        assert_eq!(browser.partition_count(), 2);
        assert_eq!(browser.max_doc(), 3);

        let removed = browser.remove_partition("p2").unwrap();
        assert_eq!(removed.name(), "p2");
        assert_eq!(browser.partition_count(), 1);
        assert_eq!(browser.max_doc(), 2);
    }

    #[test]
    fn test_duplicate_partition_name_is_an_error() {
        let browser = MultiBrowser::new(BrowseConfig::default()).unwrap();

        browser.add_partition(partition("p1", vec![Some("red")], Vec::new())).unwrap();

        assert!(browser.add_partition(partition("p1", vec![Some("blue")], Vec::new())).is_err());
        assert_eq!(browser.partition_count(), 1);
    }

    #[test]
    fn test_remove_unknown_partition_is_an_error() {
        let browser = MultiBrowser::new(BrowseConfig::default()).unwrap();

        assert!(browser.remove_partition("p1").is_err());
    }

    #[test]
    fn test_browse_globalizes_doc_ids() {
        let browser = MultiBrowser::new(BrowseConfig::default()).unwrap();
        browser
            .add_partition(partition("p1", vec![None, Some("red"), Some("blue")], Vec::new()))
            .unwrap();
        browser.add_partition(partition("p2", vec![Some("red"), None], Vec::new())).unwrap();

        let result = browser.browse(&red_request(10)).unwrap();

        assert_eq!(result.total_hits, 2);
        // The second partition's doc 0 is globalized past the first
        // partition's three documents.
        assert_eq!(
            result.hits,
            vec![BrowseHit::new(1, 2.0), BrowseHit::new(3, 2.0)]
        );
        assert_eq!(
            result.facets.facets("color").unwrap(),
            &[FacetCount::new("red", 2)]
        );
    }

    #[test]
    fn test_removed_partition_rebases_doc_ids() {
        let browser = MultiBrowser::new(BrowseConfig::default()).unwrap();
        browser.add_partition(partition("p1", vec![Some("red"), None], Vec::new())).unwrap();
        browser.add_partition(partition("p2", vec![None, None, None], Vec::new())).unwrap();
        browser.add_partition(partition("p3", vec![Some("red")], Vec::new())).unwrap();

        browser.remove_partition("p2").unwrap();

        // The last partition's documents move down into the removed
        // partition's range.
        let result = browser.browse(&red_request(10)).unwrap();
        assert_eq!(
            result.hits,
            vec![BrowseHit::new(0, 2.0), BrowseHit::new(2, 2.0)]
        );
    }

    #[test]
    fn test_browse_skips_deleted_docs() {
        let browser = MultiBrowser::new(BrowseConfig::default()).unwrap();
        browser
            .add_partition(partition("p1", vec![Some("red"), Some("red"), Some("red")], vec![1]))
            .unwrap();

        let result = browser.browse(&red_request(10)).unwrap();

        assert_eq!(result.total_hits, 2);
        assert_eq!(
            result.hits,
            vec![BrowseHit::new(0, 2.0), BrowseHit::new(2, 2.0)]
        );
    }

    #[test]
    fn test_browse_pagination() {
        let browser = MultiBrowser::new(BrowseConfig::default()).unwrap();
        browser.add_partition(partition("p1", vec![Some("red"), Some("red")], Vec::new())).unwrap();
        browser.add_partition(partition("p2", vec![Some("red"), Some("red")], Vec::new())).unwrap();

        let request = red_request(2).with_offset(1);
        let result = browser.browse(&request).unwrap();

        assert_eq!(result.total_hits, 4);
        assert_eq!(
            result.hits,
            vec![BrowseHit::new(1, 2.0), BrowseHit::new(2, 2.0)]
        );
    }

    #[test]
    fn test_browse_offset_past_all_hits_yields_empty_page() {
        let browser = MultiBrowser::new(BrowseConfig::default()).unwrap();
        browser.add_partition(partition("p1", vec![Some("red")], Vec::new())).unwrap();

        let request = red_request(10).with_offset(usize::MAX);
        let result = browser.browse(&request).unwrap();

        assert_eq!(result.total_hits, 1);
        assert!(result.hits.is_empty());
    }

    #[test]
    fn test_failing_partition_fails_browse() {
        let browser = MultiBrowser::new(BrowseConfig::default()).unwrap();
        browser.add_partition(partition("p1", vec![Some("red")], Vec::new())).unwrap();
        browser.add_partition(failing_partition(2)).unwrap();

        assert!(browser.browse(&red_request(10)).is_err());
    }

    #[test]
    fn test_partial_results_skip_failing_partition() {
        let config = BrowseConfig {
            allow_partial_results: true,
            ..Default::default()
        };
        let browser = MultiBrowser::new(config).unwrap();
        browser.add_partition(partition("p1", vec![Some("red")], Vec::new())).unwrap();
        browser.add_partition(failing_partition(2)).unwrap();

        let result = browser.browse(&red_request(10)).unwrap();

        assert_eq!(result.total_hits, 1);
        assert_eq!(result.hits, vec![BrowseHit::new(0, 2.0)]);
    }

    #[test]
    fn test_all_partitions_failing_is_an_error() {
        let config = BrowseConfig {
            allow_partial_results: true,
            ..Default::default()
        };
        let browser = MultiBrowser::new(config).unwrap();
        browser.add_partition(failing_partition(2)).unwrap();

        assert!(browser.browse(&red_request(10)).is_err());
    }
}
