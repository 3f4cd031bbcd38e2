//! Pluggable per-document scoring over facet value boosts.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::query::explain::Explanation;

/// Per-value boost factors for a facet field.
///
/// Values without an explicit entry default to a boost of 1.0. Equality and
/// hashing are bit-exact over the boost factors, so two maps that differ in
/// any single bit of any boost are distinct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoostMap {
    boosts: HashMap<String, f32>,
}

impl BoostMap {
    /// Create an empty boost map.
    pub fn new() -> Self {
        BoostMap {
            boosts: HashMap::new(),
        }
    }

    /// Set the boost factor for a facet value.
    pub fn set<S: Into<String>>(&mut self, value: S, boost: f32) {
        self.boosts.insert(value.into(), boost);
    }

    /// Set the boost factor for a facet value, builder style.
    pub fn with_boost<S: Into<String>>(mut self, value: S, boost: f32) -> Self {
        self.boosts.insert(value.into(), boost);
        self
    }

    /// Get the boost factor for a facet value.
    pub fn boost(&self, value: &str) -> f32 {
        self.boosts.get(value).copied().unwrap_or(1.0)
    }

    /// Project the boost factors for a list of facet values, in order.
    pub fn boost_list(&self, values: &[String]) -> Vec<f32> {
        values.iter().map(|value| self.boost(value)).collect()
    }

    /// Number of explicit boost entries.
    pub fn len(&self) -> usize {
        self.boosts.len()
    }

    /// Whether the map holds no explicit boosts.
    pub fn is_empty(&self) -> bool {
        self.boosts.is_empty()
    }

    /// Iterate over the explicit boost entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.boosts
            .iter()
            .map(|(value, boost)| (value.as_str(), *boost))
    }
}

impl From<HashMap<String, f32>> for BoostMap {
    fn from(boosts: HashMap<String, f32>) -> Self {
        BoostMap { boosts }
    }
}

impl PartialEq for BoostMap {
    fn eq(&self, other: &Self) -> bool {
        if self.boosts.len() != other.boosts.len() {
            return false;
        }
        self.boosts.iter().all(|(value, boost)| {
            other
                .boosts
                .get(value)
                .is_some_and(|other_boost| boost.to_bits() == other_boost.to_bits())
        })
    }
}

impl Eq for BoostMap {}

impl Hash for BoostMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Entries are sorted so the hash does not depend on map iteration
        // order, keeping it consistent with equality.
        let mut entries: Vec<(&str, u32)> = self
            .boosts
            .iter()
            .map(|(value, boost)| (value.as_str(), boost.to_bits()))
            .collect();
        entries.sort_unstable();
        for (value, bits) in entries {
            value.hash(state);
            bits.hash(state);
        }
    }
}

/// Per-document score accumulator over (document frequency, boost) pairs.
///
/// A scoring function is created once per scorer and reused across
/// documents: `clear` resets the accumulator, one `collect` call per
/// matched facet value folds that value's boost in, and `current_score`
/// reads the result.
pub trait ScoringFunction: Send + std::fmt::Debug {
    /// Reset the accumulator to the identity value.
    fn clear(&mut self);

    /// Score a single (document frequency, boost) pair without accumulating.
    fn score(&self, freq: u64, boost: f32) -> f32;

    /// Fold one (document frequency, boost) pair into the running score.
    fn collect(&mut self, freq: u64, boost: f32);

    /// The accumulated score for the current document.
    fn current_score(&self) -> f32;

    /// Explain the score of a single (document frequency, boost) pair.
    fn explain(&self, freq: u64, boost: f32) -> Explanation;

    /// Explain the combination of already computed per-value scores.
    fn explain_combined(&self, scores: &[f32]) -> Explanation;
}

/// Factory producing one scoring function per scorer instance.
pub trait ScoringFunctionFactory: Send + Sync + std::fmt::Debug {
    /// Create a scoring function for a field with `term_count` selected
    /// values over `doc_count` documents.
    fn scoring_function(&self, term_count: usize, doc_count: u64) -> Box<dyn ScoringFunction>;
}

/// Scoring function that multiplies positive boosts into the score.
///
/// The identity value is 1.0 and boosts <= 0 are skipped, so a document
/// without any boosted value keeps a neutral score.
#[derive(Debug)]
pub struct MultiplicativeScoringFunction {
    boost: f32,
}

impl MultiplicativeScoringFunction {
    pub fn new() -> Self {
        MultiplicativeScoringFunction { boost: 1.0 }
    }
}

impl Default for MultiplicativeScoringFunction {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringFunction for MultiplicativeScoringFunction {
    fn clear(&mut self) {
        self.boost = 1.0;
    }

    fn score(&self, _freq: u64, boost: f32) -> f32 {
        boost
    }

    fn collect(&mut self, _freq: u64, boost: f32) {
        if boost > 0.0 {
            self.boost *= boost;
        }
    }

    fn current_score(&self) -> f32 {
        self.boost
    }

    fn explain(&self, freq: u64, boost: f32) -> Explanation {
        Explanation::new(self.score(freq, boost), format!("boost value of: {}", boost))
    }

    fn explain_combined(&self, scores: &[f32]) -> Explanation {
        let product = scores.iter().product::<f32>();
        Explanation::new(product, format!("product of: {:?}", scores))
    }
}

/// Factory for [`MultiplicativeScoringFunction`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplicativeScoringFunctionFactory;

impl ScoringFunctionFactory for MultiplicativeScoringFunctionFactory {
    fn scoring_function(&self, _term_count: usize, _doc_count: u64) -> Box<dyn ScoringFunction> {
        Box::new(MultiplicativeScoringFunction::new())
    }
}

/// Scoring function that sums boosts into the score.
///
/// The identity value is 0.0 and every boost is added, so documents
/// matching more boosted values score higher.
#[derive(Debug)]
pub struct AdditiveScoringFunction {
    sum: f32,
}

impl AdditiveScoringFunction {
    pub fn new() -> Self {
        AdditiveScoringFunction { sum: 0.0 }
    }
}

impl Default for AdditiveScoringFunction {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringFunction for AdditiveScoringFunction {
    fn clear(&mut self) {
        self.sum = 0.0;
    }

    fn score(&self, _freq: u64, boost: f32) -> f32 {
        boost
    }

    fn collect(&mut self, _freq: u64, boost: f32) {
        self.sum += boost;
    }

    fn current_score(&self) -> f32 {
        self.sum
    }

    fn explain(&self, freq: u64, boost: f32) -> Explanation {
        Explanation::new(self.score(freq, boost), format!("boost value of: {}", boost))
    }

    fn explain_combined(&self, scores: &[f32]) -> Explanation {
        let sum = scores.iter().sum::<f32>();
        Explanation::new(sum, format!("sum of: {:?}", scores))
    }
}

/// Factory for [`AdditiveScoringFunction`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveScoringFunctionFactory;

impl ScoringFunctionFactory for AdditiveScoringFunctionFactory {
    fn scoring_function(&self, _term_count: usize, _doc_count: u64) -> Box<dyn ScoringFunction> {
        Box::new(AdditiveScoringFunction::new())
    }
}
