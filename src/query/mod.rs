//! Query types, matchers and scoring for facet-driven search.

pub mod explain;
pub mod facet_term;
pub mod matcher;
pub mod scoring;

pub use self::explain::Explanation;
pub use self::facet_term::{FacetTermQuery, FacetTermScorer};
pub use self::matcher::{DocSetMatcher, MatchAllMatcher, Matcher, NO_MORE_DOCS};
pub use self::scoring::{
    AdditiveScoringFunction, AdditiveScoringFunctionFactory, BoostMap,
    MultiplicativeScoringFunction, MultiplicativeScoringFunctionFactory, ScoringFunction,
    ScoringFunctionFactory,
};
