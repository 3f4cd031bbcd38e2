//! Facet selections: the per-field value constraints of a browse request.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How multiple selected values of one facet field combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionOperation {
    /// A document matches if it carries any selected value.
    Or,
    /// A document matches only if it carries every selected value.
    And,
}

impl Default for SelectionOperation {
    fn default() -> Self {
        SelectionOperation::Or
    }
}

impl fmt::Display for SelectionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionOperation::Or => write!(f, "or"),
            SelectionOperation::And => write!(f, "and"),
        }
    }
}

/// A user-specified set of required and excluded values for one facet field.
///
/// How inclusion and exclusion are interpreted is up to the facet handler
/// registered for the field; the selection only carries the user's choice.
/// The `Display` form is canonical and is what facet query equality is
/// defined over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacetSelection {
    /// The facet field this selection constrains.
    pub field: String,
    /// Values the selection requires, in insertion order.
    pub values: Vec<String>,
    /// Values the selection excludes, in insertion order.
    pub not_values: Vec<String>,
    /// How multiple selected values combine.
    pub operation: SelectionOperation,
}

impl FacetSelection {
    /// Create an empty selection for a field.
    pub fn new<S: Into<String>>(field: S) -> Self {
        FacetSelection {
            field: field.into(),
            values: Vec::new(),
            not_values: Vec::new(),
            operation: SelectionOperation::default(),
        }
    }

    /// Add a required value.
    pub fn add_value<S: Into<String>>(mut self, value: S) -> Self {
        self.values.push(value.into());
        self
    }

    /// Add an excluded value.
    pub fn add_not_value<S: Into<String>>(mut self, value: S) -> Self {
        self.not_values.push(value.into());
        self
    }

    /// Set the selection operation.
    pub fn with_operation(mut self, operation: SelectionOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Get the facet field name.
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl fmt::Display for FacetSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}[{}]![{}]",
            self.field,
            self.operation,
            self.values.join(","),
            self.not_values.join(",")
        )
    }
}
