//! Column type inference and coercion.

use super::converters::{parse_currency_number, parse_date_cascade, parse_plain_number};
use super::sanitizers::normalize_text_series;
use crate::utils::{column_names, is_datetime_dtype, is_numeric_dtype, millis_from_timestamp, timestamp_dtype};
use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, warn};

/// Name fragments that mark a column as holding dates.
const DATE_NAME_HINTS: [&str; 2] = ["date", "time"];

/// Whether a column name suggests calendar values.
pub fn is_date_like_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    DATE_NAME_HINTS.iter().any(|hint| lower.contains(hint))
}

/// Promotes text columns to dates or numbers and normalizes what stays text.
pub struct TypeCoercer {
    numeric_threshold: f64,
}

impl Default for TypeCoercer {
    fn default() -> Self {
        Self::new(0.4)
    }
}

impl TypeCoercer {
    pub fn new(numeric_threshold: f64) -> Self {
        Self { numeric_threshold }
    }

    /// Coerce every column independently.
    ///
    /// A column that fails to convert is left as it was; the failure is
    /// reported in the returned notes and does not stop the other columns.
    pub fn coerce_columns(&self, df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
        let mut df = df;
        let mut notes = Vec::new();

        for name in column_names(&df) {
            match self.coerce_single_column(&mut df, &name) {
                Ok(Some(note)) => {
                    debug!("  {}", note);
                    notes.push(note);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to coerce column '{}': {:#}", name, e);
                    notes.push(format!("Skipped type inference for {}: {}", name, e));
                }
            }
        }

        Ok((df, notes))
    }

    fn coerce_single_column(&self, df: &mut DataFrame, name: &str) -> Result<Option<String>> {
        let series = df
            .column(name)
            .with_context(|| format!("column '{}' disappeared", name))?
            .as_materialized_series()
            .clone();
        let dtype = series.dtype().clone();

        if is_numeric_dtype(&dtype) || is_datetime_dtype(&dtype) {
            if is_date_like_name(name) && is_numeric_dtype(&dtype) {
                debug!("Keeping '{}' numeric despite its date-like name", name);
            }
            return Ok(None);
        }

        let series = if dtype == DataType::String {
            series
        } else {
            series.cast(&DataType::String)?
        };

        if is_date_like_name(name) {
            let (converted, unparsed) = self.to_datetime(&series)?;
            df.replace(name, converted)?;
            return Ok(Some(if unparsed > 0 {
                format!(
                    "Formatted {} to DateTime ({} unparseable values set to missing)",
                    name, unparsed
                )
            } else {
                format!("Formatted {} to DateTime", name)
            }));
        }

        let height = series.len();
        if height > 0 && series.null_count() == height {
            let empty = Series::full_null(series.name().clone(), height, &DataType::Float64);
            df.replace(name, empty)?;
            return Ok(Some(format!("Converted {} to numeric (column is empty)", name)));
        }

        if let Some((converted, note)) = self.to_numeric(&series, name)? {
            df.replace(name, converted)?;
            return Ok(Some(note));
        }

        let normalized = normalize_text_series(&series)?;
        df.replace(name, normalized)?;
        Ok(Some(format!("Standardized text in {}", name)))
    }

    /// Run the date cascade; returns the new column and how many non-empty
    /// cells could not be parsed.
    fn to_datetime(&self, series: &Series) -> Result<(Series, usize)> {
        let values: Vec<Option<&str>> = series.str()?.into_iter().collect();
        let (parsed, per_pass) = parse_date_cascade(&values);

        let present = values
            .iter()
            .filter(|v| v.is_some_and(|s| !s.trim().is_empty()))
            .count();
        let unparsed = present.saturating_sub(per_pass.iter().sum());

        let millis: Vec<Option<i64>> = parsed
            .iter()
            .map(|ts| ts.as_ref().map(millis_from_timestamp))
            .collect();
        let converted = Series::new(series.name().clone(), millis).cast(&timestamp_dtype())?;

        Ok((converted, unparsed))
    }

    /// Try the plain parse, then the currency-aware parse. Returns `None`
    /// when neither clears the threshold.
    fn to_numeric(&self, series: &Series, name: &str) -> Result<Option<(Series, String)>> {
        let height = series.len();
        if height == 0 {
            return Ok(None);
        }
        let str_series = series.str()?;

        let plain: Vec<Option<f64>> = str_series
            .into_iter()
            .map(|v| v.and_then(parse_plain_number))
            .collect();
        let plain_ratio = success_ratio(&plain, height);
        if plain_ratio > self.numeric_threshold {
            return Ok(Some((
                Series::new(series.name().clone(), plain),
                format!("Converted {} to numeric", name),
            )));
        }
        if plain_ratio >= self.numeric_threshold {
            debug!("Column '{}' stays text (numeric ratio {:.2})", name, plain_ratio);
            return Ok(None);
        }

        let recovered: Vec<Option<f64>> = str_series
            .into_iter()
            .map(|v| v.and_then(parse_currency_number))
            .collect();
        let recovered_ratio = success_ratio(&recovered, height);
        if recovered_ratio > self.numeric_threshold {
            return Ok(Some((
                Series::new(series.name().clone(), recovered),
                format!("Converted {} to numeric after stripping currency formatting", name),
            )));
        }

        debug!(
            "Column '{}' stays text (numeric ratio {:.2}, currency ratio {:.2})",
            name, plain_ratio, recovered_ratio
        );
        Ok(None)
    }
}

fn success_ratio(values: &[Option<f64>], height: usize) -> f64 {
    values.iter().filter(|v| v.is_some()).count() as f64 / height as f64
}
