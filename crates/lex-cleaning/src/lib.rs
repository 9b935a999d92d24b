//! Tabular Data Cleaning Library
//!
//! Automated cleaning for uploaded CSV and Excel files, built with Rust and Polars.
//!
//! # Overview
//!
//! A single [`Pipeline::process`] call takes raw file bytes through:
//!
//! - **Ingestion**: CSV (UTF-8 or Latin-1) and XLSX decoding
//! - **Type Inference**: text columns promoted to dates or numbers, currency symbols stripped
//! - **Imputation**: median fill for numeric gaps, `Unknown` for text gaps
//! - **Fuzzy Correction**: rare misspellings merged into their dominant spelling
//! - **Deduplication**: exact duplicate rows dropped
//! - **PII Masking**: optional redaction of e-mail addresses and phone numbers
//! - **Anomaly Detection**: isolation forest over every column
//! - **Reporting**: quality score, summary, column profiles, correlations and SQL
//!
//! Every stage after ingestion is soft: if it fails the frame it received is
//! kept and the failure is recorded as a degraded [`StageReport`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_cleaning::{CleaningRequest, Pipeline, PipelineConfig};
//!
//! let bytes = std::fs::read("sales.csv")?;
//!
//! let result = Pipeline::builder()
//!     .config(PipelineConfig::builder().contamination(0.1).build()?)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(&CleaningRequest::new("sales.csv", bytes).with_pii_masking(true))?;
//!
//! println!("Quality score: {:.2}", result.insights.quality_score);
//! println!("{}", result.insights.summary);
//! ```
//!
//! # Configuration
//!
//! Use [`PipelineConfig`] to tune thresholds and the order of the
//! reorderable steps:
//!
//! ```rust,ignore
//! use lex_cleaning::{CleaningStep, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .similarity_threshold(0.8)
//!     .n_estimators(200)
//!     .stage_order(vec![
//!         CleaningStep::Deduplication,
//!         CleaningStep::FuzzyCorrection,
//!         CleaningStep::PiiMasking,
//!     ])
//!     .build()?;
//! ```
//!
//! # Natural-language filters
//!
//! [`NlQueryInterpreter`] turns phrases such as "age greater than 30" into
//! filter expressions over the cleaned columns.

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod ingest;
pub mod pipeline;
pub mod privacy;
pub mod profiler;
pub mod quality;
pub mod query;
pub mod registry;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{Deduplicator, FuzzyCorrector, TypeCoercer};
pub use config::{CleaningStep, ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{CleaningError, ResultExt};
pub use imputers::StatisticalImputer;
pub use ingest::{FileFormat, Ingestor};
pub use pipeline::{
    AnomalyDetector, CancellationToken, ClosureProgressReporter, IsolationForest, Pipeline,
    PipelineBuilder, PipelineStage, ProgressPlan, ProgressReporter, ProgressUpdate,
};
pub use privacy::PiiMasker;
pub use profiler::{ColumnProfiler, correlation_matrix};
pub use quality::{QualityReport, QualityScorer, QualityTier};
pub use query::{NlQueryInterpreter, apply_filter};
pub use registry::{ContentRegistry, InMemoryRegistry, content_hash};
pub use reporting::{ExportFormat, SqlGenerator};
pub use types::{
    Cell, CleaningRequest, CleaningResult, ColumnProfile, CorrelationEntry, FilterInterpretation,
    InsightsBundle, Record, SemanticType, StageKind, StageReport, StageStatus, ValueCount,
};
