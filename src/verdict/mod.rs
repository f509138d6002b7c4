//! Verdict
//!
//! Deterministic classification of the worker's single report.

#[allow(clippy::module_inception)]
pub mod verdict;

pub use verdict::VerdictClassifier;
