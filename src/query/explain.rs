//! Score explanations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A node in a score explanation tree.
///
/// Explanations describe how a hit's score was computed. Each node carries
/// the value it contributed, a human readable description, and the nested
/// explanations it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// The value this node contributed to the score.
    pub value: f32,
    /// What this node represents.
    pub description: String,
    /// Explanations of the inputs this value was computed from.
    pub details: Vec<Explanation>,
}

impl Explanation {
    /// Create a leaf explanation.
    pub fn new<S: Into<String>>(value: f32, description: S) -> Self {
        Explanation {
            value,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Add a nested explanation describing one input of this value.
    pub fn add_detail(&mut self, detail: Explanation) {
        self.details.push(detail);
    }

    /// Add a nested explanation, builder style.
    pub fn with_detail(mut self, detail: Explanation) -> Self {
        self.details.push(detail);
        self
    }

    fn fmt_depth(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            write!(f, "  ")?;
        }
        writeln!(f, "{} = {}", self.value, self.description)?;
        for detail in &self.details {
            detail.fmt_depth(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_depth(f, 0)
    }
}
