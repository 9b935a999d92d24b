//! Configuration types for the cleaning pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The cleaning steps whose relative order can be changed.
///
/// Ingestion, type inference and imputation always run first; anomaly
/// detection, scoring and artifact generation always run last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStep {
    /// Merge near-duplicate spellings of categorical values
    FuzzyCorrection,
    /// Drop exact duplicate rows
    Deduplication,
    /// Mask e-mail addresses and phone numbers
    PiiMasking,
}

impl CleaningStep {
    /// All reorderable steps in their default order.
    pub const DEFAULT_ORDER: [CleaningStep; 3] = [
        CleaningStep::FuzzyCorrection,
        CleaningStep::Deduplication,
        CleaningStep::PiiMasking,
    ];

    /// Parse a short CLI-friendly name (`fuzzy`, `dedup`, `pii`).
    pub fn from_short_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "fuzzy" | "fuzzy_correction" => Some(Self::FuzzyCorrection),
            "dedup" | "deduplication" => Some(Self::Deduplication),
            "pii" | "pii_masking" => Some(Self::PiiMasking),
            _ => None,
        }
    }
}

/// Configuration for the cleaning pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaning::config::{CleaningStep, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .contamination(0.1)
///     .stage_order(vec![
///         CleaningStep::Deduplication,
///         CleaningStep::FuzzyCorrection,
///         CleaningStep::PiiMasking,
///     ])
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum share of cells that must parse as numbers before a text
    /// column is promoted to numeric. Shared by the plain and the
    /// currency-aware attempt.
    /// Default: 0.4
    pub numeric_threshold: f64,

    /// Similarity ratio two categorical values must exceed to be merged.
    /// Default: 0.75
    pub similarity_threshold: f64,

    /// How many times more frequent the target spelling must be.
    /// Default: 2.0
    pub dominance_factor: f64,

    /// Columns with a distinct/rows ratio above this are treated as free
    /// text and skipped by fuzzy correction.
    /// Default: 0.9
    pub max_unique_ratio: f64,

    /// Expected fraction of anomalous rows.
    /// Default: 0.05
    pub contamination: f64,

    /// Number of isolation trees.
    /// Default: 100
    pub n_estimators: usize,

    /// Upper bound on rows sampled per tree.
    /// Default: 256
    pub max_samples: usize,

    /// Seed for the isolation forest.
    /// Default: 42
    pub random_seed: u64,

    /// Maximum number of log notes kept in the insights bundle.
    /// Default: 15
    pub log_limit: usize,

    /// Maximum number of INSERT statements emitted.
    /// Default: 50
    pub sql_insert_limit: usize,

    /// Table name used in the generated SQL.
    /// Default: "cleaned_data"
    pub sql_table_name: String,

    /// Number of cleaned rows included in the JSON preview.
    /// Default: 100
    pub preview_rows: usize,

    /// Order of the reorderable cleaning steps.
    /// Default: fuzzy correction, deduplication, PII masking
    pub stage_order: Vec<CleaningStep>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            numeric_threshold: 0.4,
            similarity_threshold: 0.75,
            dominance_factor: 2.0,
            max_unique_ratio: 0.9,
            contamination: 0.05,
            n_estimators: 100,
            max_samples: 256,
            random_seed: 42,
            log_limit: 15,
            sql_insert_limit: 50,
            sql_table_name: "cleaned_data".to_string(),
            preview_rows: 100,
            stage_order: CleaningStep::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("numeric_threshold", self.numeric_threshold),
            ("similarity_threshold", self.similarity_threshold),
            ("max_unique_ratio", self.max_unique_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(ConfigValidationError::InvalidContamination(
                self.contamination,
            ));
        }

        if self.dominance_factor < 1.0 || !self.dominance_factor.is_finite() {
            return Err(ConfigValidationError::InvalidDominanceFactor(
                self.dominance_factor,
            ));
        }

        if self.n_estimators == 0 {
            return Err(ConfigValidationError::InvalidEstimators(self.n_estimators));
        }

        if self.max_samples < 2 {
            return Err(ConfigValidationError::InvalidMaxSamples(self.max_samples));
        }

        if self.sql_table_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyTableName);
        }

        let distinct: HashSet<_> = self.stage_order.iter().collect();
        if self.stage_order.len() != CleaningStep::DEFAULT_ORDER.len()
            || distinct.len() != CleaningStep::DEFAULT_ORDER.len()
        {
            return Err(ConfigValidationError::InvalidStageOrder(
                self.stage_order.clone(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid contamination: {0} (must be in (0.0, 0.5])")]
    InvalidContamination(f64),

    #[error("Invalid dominance factor: {0} (must be at least 1.0)")]
    InvalidDominanceFactor(f64),

    #[error("Invalid number of estimators: {0} (must be at least 1)")]
    InvalidEstimators(usize),

    #[error("Invalid max samples: {0} (must be at least 2)")]
    InvalidMaxSamples(usize),

    #[error("SQL table name must not be empty")]
    EmptyTableName,

    #[error("Invalid stage order {0:?}: each cleaning step must appear exactly once")]
    InvalidStageOrder(Vec<CleaningStep>),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    numeric_threshold: Option<f64>,
    similarity_threshold: Option<f64>,
    dominance_factor: Option<f64>,
    max_unique_ratio: Option<f64>,
    contamination: Option<f64>,
    n_estimators: Option<usize>,
    max_samples: Option<usize>,
    random_seed: Option<u64>,
    log_limit: Option<usize>,
    sql_insert_limit: Option<usize>,
    sql_table_name: Option<String>,
    preview_rows: Option<usize>,
    stage_order: Option<Vec<CleaningStep>>,
}

impl PipelineConfigBuilder {
    /// Set the share of parseable cells needed to promote a column to numeric.
    pub fn numeric_threshold(mut self, threshold: f64) -> Self {
        self.numeric_threshold = Some(threshold);
        self
    }

    /// Set the similarity ratio above which two spellings are merged.
    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    /// Set how dominant the target spelling must be.
    pub fn dominance_factor(mut self, factor: f64) -> Self {
        self.dominance_factor = Some(factor);
        self
    }

    /// Set the unique ratio above which fuzzy correction skips a column.
    pub fn max_unique_ratio(mut self, ratio: f64) -> Self {
        self.max_unique_ratio = Some(ratio);
        self
    }

    /// Set the expected fraction of anomalies.
    pub fn contamination(mut self, contamination: f64) -> Self {
        self.contamination = Some(contamination);
        self
    }

    /// Set the number of isolation trees.
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = Some(n);
        self
    }

    /// Set the per-tree sample cap.
    pub fn max_samples(mut self, n: usize) -> Self {
        self.max_samples = Some(n);
        self
    }

    /// Set the anomaly detector seed.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set how many log notes are returned to the caller.
    pub fn log_limit(mut self, limit: usize) -> Self {
        self.log_limit = Some(limit);
        self
    }

    /// Set how many rows are emitted as INSERT statements.
    pub fn sql_insert_limit(mut self, limit: usize) -> Self {
        self.sql_insert_limit = Some(limit);
        self
    }

    /// Set the table name used in generated SQL.
    pub fn sql_table_name(mut self, name: impl Into<String>) -> Self {
        self.sql_table_name = Some(name.into());
        self
    }

    /// Set how many rows the JSON preview carries.
    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = Some(rows);
        self
    }

    /// Set the order of the reorderable cleaning steps.
    pub fn stage_order(mut self, order: Vec<CleaningStep>) -> Self {
        self.stage_order = Some(order);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            numeric_threshold: self.numeric_threshold.unwrap_or(defaults.numeric_threshold),
            similarity_threshold: self
                .similarity_threshold
                .unwrap_or(defaults.similarity_threshold),
            dominance_factor: self.dominance_factor.unwrap_or(defaults.dominance_factor),
            max_unique_ratio: self.max_unique_ratio.unwrap_or(defaults.max_unique_ratio),
            contamination: self.contamination.unwrap_or(defaults.contamination),
            n_estimators: self.n_estimators.unwrap_or(defaults.n_estimators),
            max_samples: self.max_samples.unwrap_or(defaults.max_samples),
            random_seed: self.random_seed.unwrap_or(defaults.random_seed),
            log_limit: self.log_limit.unwrap_or(defaults.log_limit),
            sql_insert_limit: self.sql_insert_limit.unwrap_or(defaults.sql_insert_limit),
            sql_table_name: self.sql_table_name.unwrap_or(defaults.sql_table_name),
            preview_rows: self.preview_rows.unwrap_or(defaults.preview_rows),
            stage_order: self.stage_order.unwrap_or(defaults.stage_order),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.numeric_threshold, 0.4);
        assert_eq!(config.similarity_threshold, 0.75);
        assert_eq!(config.contamination, 0.05);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.log_limit, 15);
        assert_eq!(config.sql_insert_limit, 50);
        assert_eq!(config.stage_order, CleaningStep::DEFAULT_ORDER.to_vec());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .contamination(0.1)
            .n_estimators(10)
            .sql_table_name("sales")
            .stage_order(vec![
                CleaningStep::PiiMasking,
                CleaningStep::Deduplication,
                CleaningStep::FuzzyCorrection,
            ])
            .build()
            .unwrap();

        assert_eq!(config.contamination, 0.1);
        assert_eq!(config.n_estimators, 10);
        assert_eq!(config.sql_table_name, "sales");
        assert_eq!(config.stage_order[0], CleaningStep::PiiMasking);
    }

    #[test]
    fn test_validation_invalid_threshold() {
        let result = PipelineConfig::builder().similarity_threshold(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_invalid_contamination() {
        assert!(matches!(
            PipelineConfig::builder().contamination(0.0).build().unwrap_err(),
            ConfigValidationError::InvalidContamination(_)
        ));
        assert!(PipelineConfig::builder().contamination(0.5).build().is_ok());
    }

    #[test]
    fn test_validation_rejects_repeated_step() {
        let result = PipelineConfig::builder()
            .stage_order(vec![
                CleaningStep::Deduplication,
                CleaningStep::Deduplication,
                CleaningStep::PiiMasking,
            ])
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidStageOrder(_)
        ));
    }

    #[test]
    fn test_validation_rejects_missing_step() {
        let result = PipelineConfig::builder()
            .stage_order(vec![CleaningStep::Deduplication])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_step_short_names() {
        assert_eq!(
            CleaningStep::from_short_name("Dedup"),
            Some(CleaningStep::Deduplication)
        );
        assert_eq!(
            CleaningStep::from_short_name("pii"),
            Some(CleaningStep::PiiMasking)
        );
        assert_eq!(CleaningStep::from_short_name("sort"), None);
    }

    #[test]
    fn test_pipeline_config_from_json() {
        let json = r#"{
            "numeric_threshold": 0.5,
            "similarity_threshold": 0.8,
            "dominance_factor": 3.0,
            "max_unique_ratio": 0.8,
            "contamination": 0.1,
            "n_estimators": 50,
            "max_samples": 128,
            "random_seed": 7,
            "log_limit": 20,
            "sql_insert_limit": 10,
            "sql_table_name": "uploads",
            "preview_rows": 25,
            "stage_order": ["deduplication", "fuzzy_correction", "pii_masking"]
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).expect("Should deserialize");

        assert_eq!(config.numeric_threshold, 0.5);
        assert_eq!(config.dominance_factor, 3.0);
        assert_eq!(config.max_samples, 128);
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.sql_table_name, "uploads");
        assert_eq!(config.stage_order[0], CleaningStep::Deduplication);
        assert!(config.validate().is_ok());
    }
}
