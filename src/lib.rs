//! # Sagitta
//!
//! A faceted search and browse library for Rust, inspired by Bobo Browse.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Facet-filtering term queries with pluggable scoring
//! - Section-constrained position iteration for sub-document matching
//! - Generic k-way merging of sorted sequences
//! - Cross-partition facet count aggregation
//! - Parallel browsing over multiple index partitions

pub mod browse;
pub mod error;
pub mod facet;
pub mod query;
pub mod reader;
pub mod section;
pub mod util;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
