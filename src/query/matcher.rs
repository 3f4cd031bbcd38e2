//! Matcher implementations for facet query execution.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::facet::handler::RandomAccessDocSet;
use crate::reader::Bits;

/// Sentinel document ID reported once a matcher is exhausted.
pub const NO_MORE_DOCS: u64 = u64::MAX;

/// Trait for document matchers.
///
/// A matcher is positioned on its first matching document at construction
/// and advances in strictly increasing document ID order until exhausted.
pub trait Matcher: Send + Debug {
    /// Get the current document ID.
    fn doc_id(&self) -> u64;

    /// Move to the next matching document.
    fn next(&mut self) -> Result<bool>;

    /// Skip to the first matching document >= target.
    fn skip_to(&mut self, target: u64) -> Result<bool>;

    /// Get the cost of iterating through this matcher.
    fn cost(&self) -> u64;

    /// Check if this matcher is exhausted.
    fn is_exhausted(&self) -> bool;
}

/// A matcher that matches every accepted document in a partition.
///
/// Used when a facet handler produces no membership set for a selection.
#[derive(Debug)]
pub struct MatchAllMatcher {
    current_doc: u64,
    max_doc: u64,
    accept_docs: Option<Arc<dyn Bits>>,
}

impl MatchAllMatcher {
    /// Create a new match-all matcher, positioned on the first accepted
    /// document.
    pub fn new(max_doc: u64, accept_docs: Option<Arc<dyn Bits>>) -> Self {
        let mut matcher = MatchAllMatcher {
            current_doc: 0,
            max_doc,
            accept_docs,
        };
        matcher.seek();
        matcher
    }

    fn is_accepted(&self, doc_id: u64) -> bool {
        match &self.accept_docs {
            Some(bits) => bits.get(doc_id),
            None => true,
        }
    }

    fn seek(&mut self) {
        while self.current_doc < self.max_doc && !self.is_accepted(self.current_doc) {
            self.current_doc += 1;
        }
    }
}

impl Matcher for MatchAllMatcher {
    fn doc_id(&self) -> u64 {
        if self.current_doc >= self.max_doc {
            NO_MORE_DOCS
        } else {
            self.current_doc
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.current_doc >= self.max_doc {
            return Ok(false);
        }
        self.current_doc += 1;
        self.seek();
        Ok(self.current_doc < self.max_doc)
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if target <= self.current_doc {
            return Ok(self.current_doc < self.max_doc);
        }
        self.current_doc = target;
        self.seek();
        Ok(self.current_doc < self.max_doc)
    }

    fn cost(&self) -> u64 {
        self.max_doc
    }

    fn is_exhausted(&self) -> bool {
        self.current_doc >= self.max_doc
    }
}

/// A matcher over a random-access membership set, additionally filtered by
/// the partition's accepted documents.
#[derive(Debug)]
pub struct DocSetMatcher {
    current_doc: u64,
    max_doc: u64,
    doc_set: Arc<dyn RandomAccessDocSet>,
    accept_docs: Option<Arc<dyn Bits>>,
}

impl DocSetMatcher {
    /// Create a new doc set matcher, positioned on the first member that is
    /// also accepted.
    pub fn new(
        max_doc: u64,
        doc_set: Arc<dyn RandomAccessDocSet>,
        accept_docs: Option<Arc<dyn Bits>>,
    ) -> Self {
        let mut matcher = DocSetMatcher {
            current_doc: 0,
            max_doc,
            doc_set,
            accept_docs,
        };
        matcher.seek();
        matcher
    }

    fn is_accepted(&self, doc_id: u64) -> bool {
        let live = match &self.accept_docs {
            Some(bits) => bits.get(doc_id),
            None => true,
        };
        live && self.doc_set.contains(doc_id)
    }

    fn seek(&mut self) {
        while self.current_doc < self.max_doc && !self.is_accepted(self.current_doc) {
            self.current_doc += 1;
        }
    }
}

impl Matcher for DocSetMatcher {
    fn doc_id(&self) -> u64 {
        if self.current_doc >= self.max_doc {
            NO_MORE_DOCS
        } else {
            self.current_doc
        }
    }

    fn next(&mut self) -> Result<bool> {
        if self.current_doc >= self.max_doc {
            return Ok(false);
        }
        self.current_doc += 1;
        self.seek();
        Ok(self.current_doc < self.max_doc)
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        if target <= self.current_doc {
            return Ok(self.current_doc < self.max_doc);
        }
        self.current_doc = target;
        self.seek();
        Ok(self.current_doc < self.max_doc)
    }

    fn cost(&self) -> u64 {
        self.max_doc
    }

    fn is_exhausted(&self) -> bool {
        self.current_doc >= self.max_doc
    }
}
