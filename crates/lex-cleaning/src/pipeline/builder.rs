//! The cleaning orchestrator.
//!
//! [`Pipeline`] takes one upload from raw bytes to a cleaned frame plus an
//! [`InsightsBundle`]; [`PipelineBuilder`] wires in configuration, progress
//! reporting, cancellation and the content registry.

use super::outliers::AnomalyDetector;
use super::stages::{StageLog, run_stage};
use crate::cleaner::{Deduplicator, FuzzyCorrector, TypeCoercer};
use crate::config::{CleaningStep, ConfigValidationError, PipelineConfig};
use crate::error::{CleaningError, Result};
use crate::imputers::StatisticalImputer;
use crate::ingest::Ingestor;
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, PipelineStage, ProgressPlan, ProgressReporter,
    ProgressUpdate,
};
use crate::privacy::PiiMasker;
use crate::profiler::{ColumnProfiler, correlation_matrix};
use crate::quality::QualityScorer;
use crate::registry::{ContentRegistry, content_hash};
use crate::reporting::{SqlGenerator, preview_records};
use crate::types::{
    CleaningRequest, CleaningResult, ColumnProfile, CorrelationEntry, InsightsBundle, Record,
    StageKind, StageReport, StageStatus,
};
use crate::utils::numeric_column_names;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Everything the artifact stage derives from the cleaned frame.
#[derive(Debug, Default)]
struct Artifacts {
    correlations: Vec<CorrelationEntry>,
    column_profiles: Vec<ColumnProfile>,
    sql: String,
    preview: Vec<Record>,
}

/// The main cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::{CleaningRequest, InMemoryRegistry, Pipeline, PipelineConfig};
/// use std::sync::Arc;
///
/// let pipeline = Pipeline::builder()
///     .config(PipelineConfig::builder().contamination(0.1).build()?)
///     .registry(Arc::new(InMemoryRegistry::new()))
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?;
///
/// let bytes = std::fs::read("sales.csv")?;
/// let result = pipeline.process(&CleaningRequest::new("sales.csv", bytes).with_pii_masking(true))?;
/// println!("{}", result.insights.summary);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    plan: ProgressPlan,
    reporter: Option<Arc<dyn ProgressReporter>>,
    cancel: CancellationToken,
    registry: Option<Arc<dyn ContentRegistry>>,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Clean one uploaded file.
    ///
    /// # Errors
    ///
    /// Returns `Err(CleaningError::Ingestion { .. })` when the file cannot be
    /// decoded and `Err(CleaningError::Cancelled)` when the token was
    /// cancelled. Failures inside later stages never surface here; they are
    /// recorded as degraded stage reports.
    pub fn process(&self, request: &CleaningRequest) -> Result<CleaningResult> {
        match self.process_internal(request) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Cleaning finished"));
                Ok(result)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.report_progress(ProgressUpdate::cancelled());
                } else {
                    self.report_progress(ProgressUpdate::failed(e.user_message()));
                }
                error!("Cleaning '{}' failed: {}", request.filename, e);
                Err(e)
            }
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(CleaningError::Cancelled);
        }
        Ok(())
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = self.reporter.as_deref() {
            reporter.report(update);
        }
    }

    fn stage_started(&self, kind: StageKind) {
        let stage = PipelineStage::from(kind);
        info!("{}...", stage.display_name());
        self.report_progress(self.plan.update(stage, 0.0, stage.display_name()));
    }

    fn stage_finished(&self, report: &StageReport) {
        let stage = PipelineStage::from(report.stage);
        let update = match &report.status {
            StageStatus::Completed => {
                self.plan
                    .update(stage, 1.0, format!("{} complete", stage.display_name()))
            }
            StageStatus::Degraded { reason } => self
                .plan
                .update(stage, 1.0, format!("{} degraded", stage.display_name()))
                .with_detail(reason),
            StageStatus::Skipped { reason } => self
                .plan
                .update(stage, 1.0, format!("{} skipped", stage.display_name()))
                .with_detail(reason),
        };
        self.report_progress(update);
    }

    fn process_internal(&self, request: &CleaningRequest) -> Result<CleaningResult> {
        let started = Instant::now();
        info!("Starting cleaning pipeline for '{}'", request.filename);

        let mut log = StageLog::default();

        // Step 1: Ingest. The only stage whose failure ends the run.
        self.stage_started(StageKind::Ingestion);
        let hash = content_hash(&request.content);
        let previously_seen = self
            .registry
            .as_ref()
            .is_some_and(|registry| registry.contains(&hash));
        if previously_seen {
            info!("Content {} was cleaned before", &hash[..12]);
            log.note("This file has been cleaned before");
        }

        let (original, ingest_notes) = Ingestor.ingest(&request.filename, &request.content)?;
        let ingest_report = StageReport::completed(StageKind::Ingestion, ingest_notes);
        self.stage_finished(&ingest_report);
        log.push(ingest_report);
        let rows_original = original.height();

        self.check_cancelled()?;

        // Step 2: Type inference
        self.stage_started(StageKind::TypeInference);
        let coercer = TypeCoercer::new(self.config.numeric_threshold);
        let (df, (), report) = run_stage(StageKind::TypeInference, original.clone(), |df| {
            let (df, notes) = coercer.coerce_columns(df)?;
            Ok((df, (), notes))
        });
        self.stage_finished(&report);
        log.push(report);

        self.check_cancelled()?;

        // Step 3: Imputation
        self.stage_started(StageKind::Imputation);
        let (mut df, (), report) = run_stage(StageKind::Imputation, df, |df| {
            let (df, notes) = StatisticalImputer.impute_numeric_medians(df)?;
            Ok((df, (), notes))
        });
        self.stage_finished(&report);
        log.push(report);

        // Step 4: Reorderable cleaning steps
        let mut duplicates_removed = 0;
        let mut pii_masked = 0;
        for step in &self.config.stage_order {
            self.check_cancelled()?;
            let (next, report) = match step {
                CleaningStep::FuzzyCorrection => {
                    self.stage_started(StageKind::FuzzyCorrection);
                    let corrector = FuzzyCorrector::from_config(&self.config);
                    let (next, (), report) = run_stage(StageKind::FuzzyCorrection, df, |df| {
                        let (df, notes) = corrector.correct_columns(df)?;
                        Ok((df, (), notes))
                    });
                    (next, report)
                }
                CleaningStep::Deduplication => {
                    self.stage_started(StageKind::Deduplication);
                    let (next, removed, report) = run_stage(StageKind::Deduplication, df, |df| {
                        let (df, removed) = Deduplicator.remove_duplicates(df)?;
                        let notes = if removed > 0 {
                            vec![format!("Removed {} duplicate rows", removed)]
                        } else {
                            Vec::new()
                        };
                        Ok((df, removed, notes))
                    });
                    duplicates_removed = removed;
                    (next, report)
                }
                CleaningStep::PiiMasking if request.mask_pii => {
                    self.stage_started(StageKind::PiiMasking);
                    let (next, masked, report) = run_stage(StageKind::PiiMasking, df, |df| {
                        let (df, masked, notes) = PiiMasker.mask_columns(df)?;
                        Ok((df, masked, notes))
                    });
                    pii_masked = masked;
                    (next, report)
                }
                CleaningStep::PiiMasking => (
                    df,
                    StageReport::skipped(StageKind::PiiMasking, "PII masking was not requested"),
                ),
            };
            self.stage_finished(&report);
            log.push(report);
            df = next;
        }

        self.check_cancelled()?;

        // Step 5: Anomaly detection
        self.stage_started(StageKind::AnomalyDetection);
        let detector = AnomalyDetector::from_config(&self.config);
        let (df, (anomalies_detected, skipped), report) =
            run_stage(StageKind::AnomalyDetection, df, |df| {
                let outcome = detector.remove_anomalies(df)?;
                let notes = if outcome.removed > 0 {
                    vec![format!(
                        "Removed {} anomalous rows with an isolation forest",
                        outcome.removed
                    )]
                } else {
                    Vec::new()
                };
                Ok((outcome.frame, (outcome.removed, outcome.skipped), notes))
            });
        let report = match skipped {
            Some(reason) => StageReport::skipped(StageKind::AnomalyDetection, reason),
            None => report,
        };
        self.stage_finished(&report);
        log.push(report);
        let cleaned = df;

        self.check_cancelled()?;

        // Step 6: Quality scoring
        self.stage_started(StageKind::QualityScoring);
        let quality = QualityScorer {
            rows_original,
            rows_cleaned: cleaned.height(),
            duplicates_removed,
            anomalies_detected,
            pii_masked,
        }
        .report();
        let report = StageReport::completed(StageKind::QualityScoring, Vec::new());
        self.stage_finished(&report);
        log.push(report);

        self.check_cancelled()?;

        // Step 7: Artifacts
        self.stage_started(StageKind::ArtifactGeneration);
        let sql_generator =
            SqlGenerator::new(&self.config.sql_table_name, self.config.sql_insert_limit);
        let preview_rows = self.config.preview_rows;
        let (cleaned, artifacts, report) =
            run_stage(StageKind::ArtifactGeneration, cleaned, |df| {
                let artifacts = Artifacts {
                    correlations: correlation_matrix(&df)?,
                    column_profiles: ColumnProfiler::profile_columns(&df)?,
                    sql: sql_generator.generate(&df)?,
                    preview: preview_records(&df, preview_rows)?,
                };
                Ok((df, artifacts, Vec::new()))
            });
        self.stage_finished(&report);
        log.push(report);

        if let Some(registry) = &self.registry {
            registry.record(&hash);
        }

        let (logs, stage_reports) = log.finish(self.config.log_limit);
        let insights = InsightsBundle {
            rows_original,
            rows_cleaned: cleaned.height(),
            duplicates_removed,
            anomalies_detected,
            pii_masked,
            quality_score: quality.score,
            logs,
            numeric_columns: numeric_column_names(&cleaned),
            summary: quality.summary,
            sql: artifacts.sql,
            column_profiles: artifacts.column_profiles,
            correlations: artifacts.correlations,
            previously_seen,
            content_hash: hash,
            stage_reports,
        };

        info!(
            "Pipeline finished in {:.2}s: {} -> {} rows (score {:.2})",
            started.elapsed().as_secs_f64(),
            insights.rows_original,
            insights.rows_cleaned,
            insights.quality_score
        );

        Ok(CleaningResult {
            original,
            cleaned,
            insights,
            preview: artifacts.preview,
        })
    }
}

/// Configures a [`Pipeline`]. Obtained from [`Pipeline::builder()`].
///
/// Every setting is optional: the default configuration, no progress
/// reporting, a fresh cancellation token and no registry.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    reporter: Option<Arc<dyn ProgressReporter>>,
    cancel: Option<CancellationToken>,
    registry: Option<Arc<dyn ContentRegistry>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Shorthand for [`progress_reporter`](Self::progress_reporter) with a
    /// closure. Replaces any reporter set before.
    pub fn on_progress<F>(self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter(Arc::new(ClosureProgressReporter::new(callback)))
    }

    /// The token is checked between stages; a cancelled run returns
    /// [`CleaningError::Cancelled`].
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Remember content hashes across runs. Without a registry no
    /// "previously seen" check is made.
    pub fn registry(mut self, registry: Arc<dyn ContentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Validate the configuration and assemble the pipeline.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            plan: ProgressPlan::new(&config.stage_order),
            config,
            reporter: self.reporter,
            cancel: self.cancel.unwrap_or_default(),
            registry: self.registry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;
    use parking_lot::Mutex;

    const SMALL_CSV: &[u8] = b"Name,Age\nann,30\nbob,41\nann,30\n";

    fn small_request() -> CleaningRequest {
        CleaningRequest::new("people.csv", SMALL_CSV)
    }

    #[test]
    fn test_defaults() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert!(pipeline.registry.is_none());
        assert!(pipeline.reporter.is_none());
        assert_eq!(pipeline.config().log_limit, 15);
        assert_eq!(pipeline.plan, ProgressPlan::default());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PipelineConfig {
            contamination: 0.9,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            Pipeline::builder().config(config).build(),
            Err(ConfigValidationError::InvalidContamination(_))
        ));
    }

    #[test]
    fn test_token_is_shared_with_caller() {
        let token = CancellationToken::new();
        let pipeline = Pipeline::builder()
            .cancellation_token(token.clone())
            .build()
            .unwrap();

        assert!(pipeline.check_cancelled().is_ok());
        token.cancel();
        assert!(pipeline.check_cancelled().unwrap_err().is_cancelled());
        assert!(matches!(
            pipeline.process(&small_request()),
            Err(CleaningError::Cancelled)
        ));
    }

    #[test]
    fn test_every_stage_reports_progress() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();

        Pipeline::builder()
            .on_progress(move |update| sink.lock().push(update.stage))
            .build()
            .unwrap()
            .process(&small_request())
            .unwrap();

        let stages = stages.lock();
        assert_eq!(stages.first(), Some(&PipelineStage::Ingesting));
        assert_eq!(stages.last(), Some(&PipelineStage::Complete));
        for kind in [
            PipelineStage::TypeInference,
            PipelineStage::Deduplication,
            PipelineStage::AnomalyDetection,
            PipelineStage::ArtifactGeneration,
        ] {
            assert!(stages.contains(&kind), "{:?} not reported", kind);
        }
        // skipped PII step reports only its finish
        assert_eq!(
            stages.iter().filter(|s| **s == PipelineStage::PiiMasking).count(),
            1
        );
    }

    #[test]
    fn test_pii_step_skipped_without_request() {
        let result = Pipeline::builder()
            .build()
            .unwrap()
            .process(&small_request())
            .unwrap();
        let pii = result
            .insights
            .stage_reports
            .iter()
            .find(|r| r.stage == StageKind::PiiMasking)
            .unwrap();
        assert!(matches!(pii.status, StageStatus::Skipped { .. }));
        assert_eq!(result.insights.pii_masked, 0);
        assert_eq!(result.insights.duplicates_removed, 1);
    }

    #[test]
    fn test_registry_marks_repeat_uploads() {
        let registry = Arc::new(InMemoryRegistry::new());
        let pipeline = Pipeline::builder()
            .registry(registry.clone())
            .build()
            .unwrap();

        let first = pipeline.process(&small_request()).unwrap();
        let second = pipeline.process(&small_request()).unwrap();

        assert!(!first.insights.previously_seen);
        assert!(second.insights.previously_seen);
        assert_eq!(first.insights.content_hash, second.insights.content_hash);
        assert_eq!(registry.len(), 1);
    }
}
