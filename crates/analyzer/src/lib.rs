//! Finality analysis for Casper-style DAG simulations
//!
//! This crate classifies every message of a simulation run into safe,
//! unsafe and bivalent sets from the view's finalization pointer, and
//! computes the metrics derived from that partition: latency to finality,
//! orphan rate and how forked the undecided frontier is.

pub mod analyzer;
pub mod errors;
pub mod report;

#[cfg(test)]
mod tests_prop;

pub use analyzer::{Analyzer, Category};
pub use errors::AnalysisError;
pub use report::FinalityReport;

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
