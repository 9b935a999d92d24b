//! Median imputation for numeric columns.

use crate::utils::{column_names, is_integer_dtype, is_numeric_dtype};
use anyhow::Result;
use polars::prelude::*;
use tracing::{debug, warn};

/// Fills missing numeric cells with the column median.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Impute every numeric column that has missing cells.
    ///
    /// Columns with no values at all are filled with 0. Date and text
    /// columns are never touched.
    pub fn impute_numeric_medians(&self, df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
        let mut df = df;
        let mut notes = Vec::new();

        for name in column_names(&df) {
            let needs_fill = df
                .column(&name)
                .map(|c| is_numeric_dtype(c.dtype()) && c.null_count() > 0)
                .unwrap_or(false);
            if !needs_fill {
                continue;
            }

            match Self::apply_numeric_median(&mut df, &name) {
                Ok(note) => {
                    debug!("  {}", note);
                    notes.push(note);
                }
                Err(e) => {
                    warn!("Failed to impute column '{}': {}", name, e);
                    notes.push(format!("Could not fill missing numbers in {}: {}", name, e));
                }
            }
        }

        Ok((df, notes))
    }

    /// Fill one column; returns the log note.
    pub fn apply_numeric_median(df: &mut DataFrame, col_name: &str) -> Result<String> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let fill = series.median().unwrap_or(0.0);
        let filled = Self::fill_with_value(&series, fill)?;
        df.replace(col_name, filled)?;

        Ok(format!("Filled missing numbers in {} with {}", col_name, fill))
    }

    /// Replace nulls with `value`. Integer columns keep their type unless
    /// the fill value is fractional.
    fn fill_with_value(series: &Series, value: f64) -> Result<Series> {
        if is_integer_dtype(series.dtype()) && value.fract() == 0.0 {
            let ints = series.cast(&DataType::Int64)?;
            return Ok(ints.i64()?.fill_null_with_values(value as i64)?.into_series());
        }

        let floats = series.cast(&DataType::Float64)?;
        Ok(floats.f64()?.fill_null_with_values(value)?.into_series())
    }
}
