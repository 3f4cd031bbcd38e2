//! Utility modules for Sagitta.

pub mod merge;

// Re-export commonly used types
pub use merge::*;
