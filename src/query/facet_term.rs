//! Facet term query: matches documents through a facet selection and scores
//! them from the selection's boost map.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use log::error;

use crate::error::{Result, SagittaError};
use crate::facet::handler::{DocScorer, FacetHandler, FacetHandlerLookup};
use crate::facet::selection::FacetSelection;
use crate::query::explain::Explanation;
use crate::query::matcher::{DocSetMatcher, MatchAllMatcher, Matcher};
use crate::query::scoring::{
    BoostMap, MultiplicativeScoringFunctionFactory, ScoringFunctionFactory,
};
use crate::reader::{Bits, SegmentReader};

/// A query that matches the documents selected by a facet selection.
///
/// The facet handler registered for the selection's field supplies the
/// membership set. Handlers that support scoring additionally bind a
/// per-document scorer to the boost map; matches against handlers without
/// scoring support score a constant 1.0.
#[derive(Debug, Clone)]
pub struct FacetTermQuery {
    /// The facet selection driving the match.
    selection: FacetSelection,
    /// Per-value boost factors.
    boosts: BoostMap,
    /// Factory for per-scorer scoring functions.
    scoring_factory: Arc<dyn ScoringFunctionFactory>,
    /// The boost factor for this query.
    boost: f32,
}

impl FacetTermQuery {
    /// Create a new facet term query with multiplicative boost scoring.
    pub fn new(selection: FacetSelection, boosts: BoostMap) -> Self {
        FacetTermQuery {
            selection,
            boosts,
            scoring_factory: Arc::new(MultiplicativeScoringFunctionFactory),
            boost: 1.0,
        }
    }

    /// Set the scoring function factory.
    pub fn with_scoring_factory(
        mut self,
        scoring_factory: Arc<dyn ScoringFunctionFactory>,
    ) -> Self {
        self.scoring_factory = scoring_factory;
        self
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Get the facet field this query matches on.
    pub fn field(&self) -> &str {
        self.selection.field()
    }

    /// Get the facet selection.
    pub fn selection(&self) -> &FacetSelection {
        &self.selection
    }

    /// Get the boost map.
    pub fn boosts(&self) -> &BoostMap {
        &self.boosts
    }

    /// Get the boost factor.
    pub fn boost(&self) -> f32 {
        self.boost
    }

    /// The (field, value) terms this query selects.
    pub fn terms(&self) -> Vec<(&str, &str)> {
        self.selection
            .values
            .iter()
            .map(|value| (self.selection.field(), value.as_str()))
            .collect()
    }

    /// Human readable description of this query.
    pub fn description(&self) -> String {
        if self.boost == 1.0 {
            format!("facet({})", self.selection)
        } else {
            format!("facet({})^{}", self.selection, self.boost)
        }
    }

    /// Build a scorer over one partition.
    ///
    /// The membership set comes from the field's facet handler; documents
    /// rejected by `accept_docs` never match. A handler that produces no
    /// membership set matches every accepted document.
    ///
    /// Fails when no handler is registered for the field.
    pub fn scorer(
        &self,
        reader: &dyn SegmentReader,
        handlers: &dyn FacetHandlerLookup,
        accept_docs: Option<Arc<dyn Bits>>,
    ) -> Result<FacetTermScorer> {
        let handler = self.resolve_handler(handlers)?;

        let matcher: Box<dyn Matcher> = match handler.doc_set(&self.selection, reader)? {
            Some(doc_set) => Box::new(DocSetMatcher::new(reader.max_doc(), doc_set, accept_docs)),
            None => Box::new(MatchAllMatcher::new(reader.max_doc(), accept_docs)),
        };

        let doc_scorer = handler.doc_scorer(reader, self.scoring_factory.as_ref(), &self.boosts);

        Ok(FacetTermScorer {
            matcher,
            doc_scorer,
            boost: self.boost,
        })
    }

    /// Explain the score of one document in a partition, or `None` when the
    /// field has no registered handler or its handler does not support
    /// scoring.
    pub fn explain(
        &self,
        reader: &dyn SegmentReader,
        handlers: &dyn FacetHandlerLookup,
        doc_id: u64,
    ) -> Result<Option<Explanation>> {
        let handler = match handlers.handler_for(self.selection.field()) {
            Some(handler) => handler,
            None => return Ok(None),
        };

        let scorer =
            match handler.doc_scorer(reader, self.scoring_factory.as_ref(), &self.boosts) {
                Some(scorer) => scorer,
                None => return Ok(None),
            };

        let detail = scorer.explain(doc_id);
        let boost_detail = Explanation::new(self.boost, "boost");
        let mut explanation = Explanation::new(detail.value * self.boost, "product of:");
        explanation.add_detail(detail);
        explanation.add_detail(boost_detail);
        Ok(Some(explanation))
    }

    fn resolve_handler(&self, handlers: &dyn FacetHandlerLookup) -> Result<Arc<dyn FacetHandler>> {
        let field = self.selection.field();
        match handlers.handler_for(field) {
            Some(handler) => Ok(handler),
            None => {
                error!("facet handler not found for field: {}", field);
                Err(SagittaError::facet(format!(
                    "facet handler not found for field: {}",
                    field
                )))
            }
        }
    }
}

impl PartialEq for FacetTermQuery {
    fn eq(&self, other: &Self) -> bool {
        // The query boost and scoring factory are not part of identity;
        // selections compare through their canonical string form.
        self.field() == other.field()
            && self.selection.to_string() == other.selection.to_string()
            && self.boosts == other.boosts
    }
}

impl Eq for FacetTermQuery {}

impl Hash for FacetTermQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field().hash(state);
        self.selection.to_string().hash(state);
        self.boosts.hash(state);
    }
}

/// Scorer produced by [`FacetTermQuery`] for one partition.
///
/// Matching delegates to the underlying matcher. The score of the current
/// document is the handler's per-document score times the query boost, or
/// 1.0 when the handler does not support scoring.
#[derive(Debug)]
pub struct FacetTermScorer {
    matcher: Box<dyn Matcher>,
    doc_scorer: Option<Box<dyn DocScorer>>,
    boost: f32,
}

impl FacetTermScorer {
    /// Score the current document.
    pub fn score(&mut self) -> f32 {
        match &mut self.doc_scorer {
            Some(scorer) => scorer.score(self.matcher.doc_id()) * self.boost,
            None => 1.0,
        }
    }
}

impl Matcher for FacetTermScorer {
    fn doc_id(&self) -> u64 {
        self.matcher.doc_id()
    }

    fn next(&mut self) -> Result<bool> {
        self.matcher.next()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        self.matcher.skip_to(target)
    }

    fn cost(&self) -> u64 {
        self.matcher.cost()
    }

    fn is_exhausted(&self) -> bool {
        self.matcher.is_exhausted()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::facet::handler::{BitDocSet, RandomAccessDocSet};
    use crate::query::matcher::NO_MORE_DOCS;
    use crate::query::scoring::ScoringFunction;
    use crate::reader::PositionIterator;

    #[derive(Debug)]
    struct FixedReader {
        max_doc: u64,
    }

    impl SegmentReader for FixedReader {
        fn max_doc(&self) -> u64 {
            self.max_doc
        }

        fn is_live(&self, _doc_id: u64) -> bool {
            true
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

    /// Scorer fixture: the score of a document is the boost of its value.
    #[derive(Debug)]
    struct ValueBoostScorer {
        value_by_doc: HashMap<u64, String>,
        boosts: BoostMap,
        function: Box<dyn ScoringFunction>,
    }

    impl DocScorer for ValueBoostScorer {
        fn score(&mut self, doc_id: u64) -> f32 {
            self.function.clear();
            if let Some(value) = self.value_by_doc.get(&doc_id) {
                self.function.collect(1, self.boosts.boost(value));
            }
            self.function.current_score()
        }

        fn explain(&self, doc_id: u64) -> Explanation {
            match self.value_by_doc.get(&doc_id) {
                Some(value) => self.function.explain(1, self.boosts.boost(value)),
                None => self.function.explain_combined(&[]),
            }
        }
    }

    /// Handler fixture over a small single-valued color field.
    #[derive(Debug)]
    struct ColorHandler {
        max_doc: u64,
        value_by_doc: HashMap<u64, String>,
        scoreable: bool,
        constrains: bool,
    }

    impl ColorHandler {
        fn new(scoreable: bool, constrains: bool) -> Self {
            let mut value_by_doc = HashMap::new();
            value_by_doc.insert(1, "red".to_string());
            value_by_doc.insert(2, "blue".to_string());
            value_by_doc.insert(3, "red".to_string());
            value_by_doc.insert(4, "green".to_string());
            ColorHandler {
                max_doc: 6,
                value_by_doc,
                scoreable,
                constrains,
            }
        }
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
            if !self.constrains {
                return Ok(None);
            }
            let doc_ids: Vec<u64> = self
                .value_by_doc
                .iter()
                .filter(|(_, value)| selection.values.contains(*value))
                .map(|(&doc_id, _)| doc_id)
                .collect();
            Ok(Some(Arc::new(BitDocSet::from_doc_ids(
                self.max_doc,
                &doc_ids,
            ))))
        }

        fn doc_scorer(
            &self,
            _reader: &dyn SegmentReader,
            scoring_factory: &dyn ScoringFunctionFactory,
            boosts: &BoostMap,
        ) -> Option<Box<dyn DocScorer>> {
            if !self.scoreable {
                return None;
            }
            Some(Box::new(ValueBoostScorer {
                value_by_doc: self.value_by_doc.clone(),
                boosts: boosts.clone(),
                function: scoring_factory.scoring_function(self.value_by_doc.len(), self.max_doc),
            }))
        }
    }

    fn handlers(scoreable: bool, constrains: bool) -> HashMap<String, Arc<dyn FacetHandler>> {
        let mut handlers: HashMap<String, Arc<dyn FacetHandler>> = HashMap::new();
        handlers.insert(
            "color".to_string(),
            Arc::new(ColorHandler::new(scoreable, constrains)),
        );
        handlers
    }

    fn selection(values: &[&str]) -> FacetSelection {
        let mut selection = FacetSelection::new("color");
        for value in values {
            selection = selection.add_value(*value);
        }
        selection
    }

    fn collect_scored(scorer: &mut FacetTermScorer) -> Vec<(u64, f32)> {
        let mut hits = Vec::new();
        while !scorer.is_exhausted() {
            hits.push((scorer.doc_id(), scorer.score()));
            scorer.next().unwrap();
        }
        hits
    }

    #[test]
    fn test_scorer_matches_selected_docs() {
        let query = FacetTermQuery::new(
            selection(&["red", "blue"]),
            BoostMap::new().with_boost("red", 2.0),
        );
        let reader = FixedReader { max_doc: 6 };
        let mut scorer = query.scorer(&reader, &handlers(true, true), None).unwrap();

        let hits = collect_scored(&mut scorer);
        assert_eq!(hits, vec![(1, 2.0), (2, 1.0), (3, 2.0)]);
        assert_eq!(scorer.doc_id(), NO_MORE_DOCS);
    }

    #[test]
    fn test_scorer_applies_query_boost() {
        let query = FacetTermQuery::new(
            selection(&["red"]),
            BoostMap::new().with_boost("red", 2.0),
        )
        .with_boost(3.0);
        let reader = FixedReader { max_doc: 6 };
        let mut scorer = query.scorer(&reader, &handlers(true, true), None).unwrap();

        let hits = collect_scored(&mut scorer);
        assert_eq!(hits, vec![(1, 6.0), (3, 6.0)]);
    }

    #[test]
    fn test_unscored_match_scores_one() {
        // Without a doc scorer every match scores 1.0 and the query boost
        // does not apply.
        let query = FacetTermQuery::new(selection(&["red"]), BoostMap::new()).with_boost(5.0);
        let reader = FixedReader { max_doc: 6 };
        let mut scorer = query.scorer(&reader, &handlers(false, true), None).unwrap();

        let hits = collect_scored(&mut scorer);
        assert_eq!(hits, vec![(1, 1.0), (3, 1.0)]);
    }

    #[test]
    fn test_unconstrained_selection_matches_all() {
        let query = FacetTermQuery::new(selection(&["red"]), BoostMap::new());
        let reader = FixedReader { max_doc: 3 };
        let mut scorer = query.scorer(&reader, &handlers(false, false), None).unwrap();

        let hits = collect_scored(&mut scorer);
        assert_eq!(hits, vec![(0, 1.0), (1, 1.0), (2, 1.0)]);
    }

    #[test]
    fn test_accept_docs_reject_matches() {
        let mut accept = bit_vec::BitVec::from_elem(6, true);
        accept.set(3, false);
        let accept: Arc<dyn Bits> = Arc::new(accept);

        let query = FacetTermQuery::new(selection(&["red", "blue"]), BoostMap::new());
        let reader = FixedReader { max_doc: 6 };
        let mut scorer = query
            .scorer(&reader, &handlers(false, true), Some(accept))
            .unwrap();

        let hits = collect_scored(&mut scorer);
        assert_eq!(hits.iter().map(|&(doc, _)| doc).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_missing_handler_fails_scorer() {
        let query = FacetTermQuery::new(selection(&["red"]), BoostMap::new());
        let reader = FixedReader { max_doc: 6 };
        let empty: HashMap<String, Arc<dyn FacetHandler>> = HashMap::new();

        assert!(query.scorer(&reader, &empty, None).is_err());
    }

    #[test]
    fn test_explain_without_handler_returns_none() {
        // Only scorer construction treats a missing handler as a
        // configuration error; explain degrades to an unscored match.
        let query = FacetTermQuery::new(selection(&["red"]), BoostMap::new());
        let reader = FixedReader { max_doc: 6 };
        let empty: HashMap<String, Arc<dyn FacetHandler>> = HashMap::new();

        assert!(query.explain(&reader, &empty, 1).unwrap().is_none());
    }

    #[test]
    fn test_explain_is_a_product_of_score_and_boost() {
        let query = FacetTermQuery::new(
            selection(&["red"]),
            BoostMap::new().with_boost("red", 2.0),
        )
        .with_boost(3.0);
        let reader = FixedReader { max_doc: 6 };

        let explanation = query
            .explain(&reader, &handlers(true, true), 1)
            .unwrap()
            .unwrap();

        assert_eq!(explanation.value, 6.0);
        assert_eq!(explanation.description, "product of:");
        assert_eq!(explanation.details.len(), 2);
        assert_eq!(explanation.details[0].value, 2.0);
        assert_eq!(explanation.details[1].value, 3.0);
        assert_eq!(explanation.details[1].description, "boost");
    }

    #[test]
    fn test_explain_without_scoring_support() {
        let query = FacetTermQuery::new(selection(&["red"]), BoostMap::new());
        let reader = FixedReader { max_doc: 6 };

        let explanation = query.explain(&reader, &handlers(false, true), 1).unwrap();
        assert!(explanation.is_none());
    }

    #[test]
    fn test_query_equality_is_bit_exact_over_boosts() {
        let a = FacetTermQuery::new(selection(&["red"]), BoostMap::new().with_boost("red", 0.0));
        let b = FacetTermQuery::new(selection(&["red"]), BoostMap::new().with_boost("red", 0.0));
        let c = FacetTermQuery::new(selection(&["red"]), BoostMap::new().with_boost("red", -0.0));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_query_equality_ignores_query_boost() {
        let a = FacetTermQuery::new(selection(&["red"]), BoostMap::new());
        let b = FacetTermQuery::new(selection(&["red"]), BoostMap::new()).with_boost(4.0);
        let c = FacetTermQuery::new(selection(&["blue"]), BoostMap::new());

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_query_description() {
        let query = FacetTermQuery::new(selection(&["red", "blue"]), BoostMap::new());
        assert_eq!(query.description(), "facet(color:or[red,blue]![])");

        let boosted = query.with_boost(2.0);
        assert_eq!(boosted.description(), "facet(color:or[red,blue]![])^2");
    }

    #[test]
    fn test_query_terms() {
        let query = FacetTermQuery::new(selection(&["red", "blue"]), BoostMap::new());
        assert_eq!(query.terms(), vec![("color", "red"), ("color", "blue")]);
    }
}
