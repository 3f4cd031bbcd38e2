//! Error types for the Sagitta library.
//!
//! This module provides error handling for all Sagitta operations.
//! All errors are represented by the [`SagittaError`] enum, which provides
//! detailed information about what went wrong.
//!
//! # Examples
//!
//! ```
//! use sagitta::error::{SagittaError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     // Return an error
//!     Err(SagittaError::facet("No handler registered for field 'color'"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for Sagitta operations.
///
/// This enum represents all possible errors that can occur in the Sagitta
/// library. It uses the `thiserror` crate for automatic `Error` trait
/// implementation and provides convenient constructor methods for creating
/// specific error types.
#[derive(Error, Debug)]
pub enum SagittaError {
    /// I/O errors (file operations, network, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Facet-related errors (missing handlers, bad specs, etc.)
    #[error("Facet error: {0}")]
    Facet(String),

    /// Query-related errors
    #[error("Query error: {0}")]
    Query(String),

    /// Section decoding errors
    #[error("Section error: {0}")]
    Section(String),

    /// Index-related errors
    #[error("Index error: {0}")]
    Index(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SagittaError.
pub type Result<T> = std::result::Result<T, SagittaError>;

impl SagittaError {
    /// Create a new facet error.
    pub fn facet<S: Into<String>>(msg: S) -> Self {
        SagittaError::Facet(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        SagittaError::Query(msg.into())
    }

    /// Create a new section error.
    pub fn section<S: Into<String>>(msg: S) -> Self {
        SagittaError::Section(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        SagittaError::Index(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SagittaError::Other(msg.into())
    }
}
