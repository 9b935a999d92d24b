//! Pipeline module.
//!
//! This module provides the cleaning pipeline, the isolation forest used by
//! its anomaly stage, and progress/cancellation plumbing.

mod builder;
pub mod isolation;
pub mod outliers;
pub mod progress;
mod stages;

pub use builder::{Pipeline, PipelineBuilder};
pub use isolation::IsolationForest;
pub use outliers::{AnomalyDetector, AnomalyOutcome};
pub use progress::{
    CancellationToken, ClosureProgressReporter, PipelineStage, ProgressPlan, ProgressReporter,
    ProgressUpdate,
};
