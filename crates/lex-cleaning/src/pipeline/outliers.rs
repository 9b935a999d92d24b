//! Multivariate anomaly removal.
//!
//! Every column contributes one feature: numbers as they are, text and dates
//! as the index of the value in the column's sorted distinct values. The
//! matrix is standardized before it is handed to the isolation forest.

use super::isolation::IsolationForest;
use crate::config::PipelineConfig;
use crate::types::{Cell, SemanticType};
use crate::utils::{frame_to_cells, semantic_type};
use anyhow::Result;
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// What the anomaly stage did to a frame.
#[derive(Debug)]
pub struct AnomalyOutcome {
    pub frame: DataFrame,
    pub removed: usize,
    /// Set when the frame could not be scored (no columns or too few rows).
    pub skipped: Option<String>,
}

/// Removes rows an isolation forest scores as anomalous.
pub struct AnomalyDetector {
    forest: IsolationForest,
    contamination: f64,
}

impl AnomalyDetector {
    pub fn new(forest: IsolationForest, contamination: f64) -> Self {
        Self {
            forest,
            contamination,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(IsolationForest::from_config(config), config.contamination)
    }

    pub fn remove_anomalies(&self, df: DataFrame) -> Result<AnomalyOutcome> {
        if df.width() == 0 {
            return Ok(Self::skip(df, "No feature columns to score"));
        }
        if df.height() < 2 {
            return Ok(Self::skip(df, "Too few rows for anomaly detection"));
        }

        let rows = standardize(feature_matrix(&df)?);
        let (flags, _) = self.forest.flag_outliers(&rows, self.contamination);
        let removed = flags.iter().filter(|f| **f).count();
        debug!(
            "Isolation forest flagged {} of {} rows ({} features)",
            removed,
            rows.len(),
            df.width()
        );
        if removed == 0 {
            return Ok(AnomalyOutcome {
                frame: df,
                removed,
                skipped: None,
            });
        }

        let keep: Vec<bool> = flags.iter().map(|f| !f).collect();
        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        Ok(AnomalyOutcome {
            frame: df.filter(&mask)?,
            removed,
            skipped: None,
        })
    }

    fn skip(df: DataFrame, reason: &str) -> AnomalyOutcome {
        debug!("Anomaly detection skipped: {}", reason);
        AnomalyOutcome {
            frame: df,
            removed: 0,
            skipped: Some(reason.to_string()),
        }
    }
}

/// Column-major features for every column of the frame.
fn feature_columns(df: &DataFrame) -> PolarsResult<Vec<Vec<f64>>> {
    let cells = frame_to_cells(df)?;
    let kinds: Vec<SemanticType> = df.get_columns().iter().map(|c| semantic_type(c.dtype())).collect();

    Ok(cells
        .into_iter()
        .zip(kinds)
        .map(|(column, kind)| match kind {
            SemanticType::Numeric => column
                .iter()
                .map(|cell| match cell {
                    Cell::Integer(v) => *v as f64,
                    Cell::Number(v) if v.is_finite() => *v,
                    _ => 0.0,
                })
                .collect(),
            SemanticType::Date | SemanticType::Text => label_encode(&column),
        })
        .collect())
}

/// Row-major feature matrix.
pub fn feature_matrix(df: &DataFrame) -> PolarsResult<Vec<Vec<f64>>> {
    let columns = feature_columns(df)?;
    Ok((0..df.height())
        .map(|r| columns.iter().map(|c| c[r]).collect())
        .collect())
}

/// Codes are positions in the sorted distinct renderings; missing cells get 0.
fn label_encode(column: &[Cell]) -> Vec<f64> {
    let rendered: Vec<Option<String>> = column.iter().map(Cell::render).collect();
    let distinct: BTreeSet<&str> = rendered.iter().flatten().map(String::as_str).collect();
    let ordered: Vec<&str> = distinct.into_iter().collect();
    rendered
        .iter()
        .map(|v| {
            v.as_deref()
                .and_then(|s| ordered.binary_search(&s).ok())
                .map(|i| i as f64)
                .unwrap_or(0.0)
        })
        .collect()
}

/// Zero mean, unit population variance per feature. Constant features are
/// only centred.
pub fn standardize(mut rows: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let n = rows.len();
    if n == 0 {
        return rows;
    }
    let width = rows[0].len();
    for f in 0..width {
        let mean = rows.iter().map(|r| r[f]).sum::<f64>() / n as f64;
        let var = rows.iter().map(|r| (r[f] - mean).powi(2)).sum::<f64>() / n as f64;
        let std = var.sqrt();
        let scale = if std > 0.0 && std.is_finite() { std } else { 1.0 };
        for row in rows.iter_mut() {
            row[f] = (row[f] - mean) / scale;
        }
    }
    rows
}
