//! Data quality scoring module.
//!
//! Turns the row counts of a finished run into a 0-100 score and a short
//! narrative summary.

mod analyzer;

pub use analyzer::{QualityReport, QualityScorer, QualityTier};
