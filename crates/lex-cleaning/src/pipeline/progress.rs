//! Progress reporting and cancellation support for the cleaning pipeline.
//!
//! A run can be observed through a [`ProgressReporter`] and stopped from
//! another thread through a [`CancellationToken`]. Overall progress is laid
//! out by a [`ProgressPlan`], so it keeps increasing whatever order the
//! reorderable steps run in.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_cleaning::{CancellationToken, CleaningRequest, Pipeline};
//!
//! let token = CancellationToken::new();
//! let stopper = token.clone();
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     stopper.cancel();
//! });
//!
//! let outcome = Pipeline::builder()
//!     .cancellation_token(token)
//!     .on_progress(|update| eprintln!("{:>3.0}% {}", update.progress * 100.0, update.message))
//!     .build()?
//!     .process(&CleaningRequest::new("sales.csv", bytes));
//! ```

use crate::config::CleaningStep;
use crate::types::StageKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Phases of a cleaning run, plus the three terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading and decoding the uploaded file
    Ingesting,
    /// Promoting text columns to dates and numbers
    TypeInference,
    Imputation,
    /// Merging misspelled categories
    FuzzyCorrection,
    Deduplication,
    /// Redacting e-mail addresses and phone numbers
    PiiMasking,
    /// Isolation forest scoring and outlier removal
    AnomalyDetection,
    QualityScoring,
    /// Correlations, profiles and SQL
    ArtifactGeneration,
    Complete,
    Cancelled,
    Failed,
}

impl PipelineStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ingesting => "Reading File",
            Self::TypeInference => "Inferring Types",
            Self::Imputation => "Filling Missing Numbers",
            Self::FuzzyCorrection => "Correcting Spelling",
            Self::Deduplication => "Removing Duplicates",
            Self::PiiMasking => "Masking Personal Data",
            Self::AnomalyDetection => "Detecting Anomalies",
            Self::QualityScoring => "Scoring Quality",
            Self::ArtifactGeneration => "Generating Artifacts",
            Self::Complete => "Done",
            Self::Cancelled => "Stopped",
            Self::Failed => "Failed",
        }
    }

    /// Share of a whole run spent in this stage. Working stages sum to 1.0.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Ingesting | Self::Imputation | Self::PiiMasking => 0.08,
            Self::TypeInference => 0.12,
            Self::FuzzyCorrection | Self::ArtifactGeneration => 0.15,
            Self::Deduplication => 0.07,
            Self::AnomalyDetection => 0.25,
            Self::QualityScoring => 0.02,
            Self::Complete | Self::Cancelled | Self::Failed => 0.0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }
}

impl From<StageKind> for PipelineStage {
    fn from(kind: StageKind) -> Self {
        match kind {
            StageKind::Ingestion => Self::Ingesting,
            StageKind::TypeInference => Self::TypeInference,
            StageKind::Imputation => Self::Imputation,
            StageKind::FuzzyCorrection => Self::FuzzyCorrection,
            StageKind::Deduplication => Self::Deduplication,
            StageKind::PiiMasking => Self::PiiMasking,
            StageKind::AnomalyDetection => Self::AnomalyDetection,
            StageKind::QualityScoring => Self::QualityScoring,
            StageKind::ArtifactGeneration => Self::ArtifactGeneration,
        }
    }
}

impl From<CleaningStep> for PipelineStage {
    fn from(step: CleaningStep) -> Self {
        match step {
            CleaningStep::FuzzyCorrection => Self::FuzzyCorrection,
            CleaningStep::Deduplication => Self::Deduplication,
            CleaningStep::PiiMasking => Self::PiiMasking,
        }
    }
}

/// Where each working stage starts on the 0.0 - 1.0 scale, for one order
/// of the reorderable steps.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressPlan {
    starts: Vec<(PipelineStage, f32)>,
}

impl ProgressPlan {
    pub fn new(order: &[CleaningStep]) -> Self {
        let sequence = [
            PipelineStage::Ingesting,
            PipelineStage::TypeInference,
            PipelineStage::Imputation,
        ]
        .into_iter()
        .chain(order.iter().map(|&step| PipelineStage::from(step)))
        .chain([
            PipelineStage::AnomalyDetection,
            PipelineStage::QualityScoring,
            PipelineStage::ArtifactGeneration,
        ]);

        let mut offset = 0.0;
        let starts = sequence
            .map(|stage| {
                let start = offset;
                offset += stage.weight();
                (stage, start)
            })
            .collect();
        Self { starts }
    }

    /// Overall progress at the start of `stage`. Terminal stages sit at 1.0
    /// (complete) or 0.0.
    pub fn start_of(&self, stage: PipelineStage) -> f32 {
        if stage == PipelineStage::Complete {
            return 1.0;
        }
        self.starts
            .iter()
            .find(|(s, _)| *s == stage)
            .map_or(0.0, |(_, start)| *start)
    }

    /// An update for `stage` with `stage_progress` of it done.
    pub fn update(
        &self,
        stage: PipelineStage,
        stage_progress: f32,
        message: impl Into<String>,
    ) -> ProgressUpdate {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        let progress = self.start_of(stage) + stage.weight() * stage_progress;
        ProgressUpdate {
            stage,
            detail: None,
            progress: progress.min(1.0),
            stage_progress,
            message: message.into(),
        }
    }
}

impl Default for ProgressPlan {
    fn default() -> Self {
        Self::new(&CleaningStep::DEFAULT_ORDER)
    }
}

/// A single progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// Extra context such as the reason a stage degraded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within `stage` (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    fn terminal(stage: PipelineStage, progress: f32, message: impl Into<String>) -> Self {
        Self {
            stage,
            detail: None,
            progress,
            stage_progress: progress,
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::terminal(PipelineStage::Complete, 1.0, message)
    }

    pub fn cancelled() -> Self {
        Self::terminal(PipelineStage::Cancelled, 0.0, "Cleaning was cancelled")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::terminal(PipelineStage::Failed, 0.0, message)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

/// Receives progress updates while a run is in flight.
///
/// The pipeline may run on a worker thread while the reporter forwards
/// events elsewhere, hence `Send + Sync`.
pub trait ProgressReporter: Send + Sync {
    /// Called at every stage boundary. Keep it cheap.
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F> {
    callback: F,
}

impl<F: Fn(ProgressUpdate) + Send + Sync> ClosureProgressReporter<F> {
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F: Fn(ProgressUpdate) + Send + Sync> ProgressReporter for ClosureProgressReporter<F> {
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update)
    }
}

/// Shared stop flag for a running pipeline.
///
/// Clones share one flag. The pipeline checks it between stages and returns
/// [`CleaningError::Cancelled`](crate::error::CleaningError::Cancelled) once
/// it is set; no partial result is produced.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag so the token can be reused for another run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}
