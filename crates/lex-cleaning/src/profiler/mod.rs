//! Column profiling and correlation artifacts.
//!
//! This module provides:
//! - Per-column summaries (missing count, distinct count, top values)
//! - The Pearson correlation matrix over numeric columns

mod statistics;

pub use statistics::correlation_matrix;

use crate::cleaner::value_frequencies;
use crate::types::{ColumnProfile, ValueCount};
use crate::utils::{semantic_type, series_to_cells};
use anyhow::Result;
use polars::prelude::*;

/// Number of most frequent values kept per column.
pub const TOP_VALUES: usize = 5;

/// Builds one [`ColumnProfile`] per column.
pub struct ColumnProfiler;

impl ColumnProfiler {
    /// Profile every column, in frame order. A frame without rows yields no
    /// profiles.
    pub fn profile_columns(df: &DataFrame) -> Result<Vec<ColumnProfile>> {
        if df.height() == 0 {
            return Ok(Vec::new());
        }
        df.get_columns()
            .iter()
            .map(|c| Self::profile_column(c.as_materialized_series()))
            .collect()
    }

    fn profile_column(series: &Series) -> Result<ColumnProfile> {
        let rendered: Vec<Option<String>> = series_to_cells(series)?
            .iter()
            .map(|cell| cell.render())
            .collect();

        let freqs = value_frequencies(rendered.iter().map(|v| v.as_deref()));
        let missing_count = rendered.iter().filter(|v| v.is_none()).count();
        let sample = rendered.iter().flatten().next().cloned();

        Ok(ColumnProfile {
            name: series.name().to_string(),
            declared_type: semantic_type(series.dtype()),
            missing_count,
            unique_count: freqs.len(),
            top_values: freqs
                .iter()
                .take(TOP_VALUES)
                .map(|(value, count)| ValueCount {
                    value: value.clone(),
                    count: *count,
                })
                .collect(),
            sample,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SemanticType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_profile_columns() {
        let df = df! {
            "Fruit" => [Some("Apple"), Some("Pear"), Some("Apple"), None, Some("Fig")],
            "Qty" => [Some(1.0), Some(2.5), None, Some(1.0), Some(1.0)],
        }
        .unwrap();
        let profiles = ColumnProfiler::profile_columns(&df).unwrap();
        assert_eq!(profiles.len(), 2);

        let fruit = &profiles[0];
        assert_eq!(fruit.declared_type, SemanticType::Text);
        assert_eq!(fruit.missing_count, 1);
        assert_eq!(fruit.unique_count, 3);
        assert_eq!(fruit.sample.as_deref(), Some("Apple"));
        assert_eq!(
            fruit.top_values,
            vec![
                ValueCount { value: "Apple".to_string(), count: 2 },
                ValueCount { value: "Pear".to_string(), count: 1 },
                ValueCount { value: "Fig".to_string(), count: 1 },
            ]
        );

        let qty = &profiles[1];
        assert_eq!(qty.declared_type, SemanticType::Numeric);
        assert_eq!(qty.top_values[0], ValueCount { value: "1".to_string(), count: 3 });
    }

    #[test]
    fn test_top_values_capped() {
        let df = df! { "n" => [1, 2, 3, 4, 5, 6, 7] }.unwrap();
        let profiles = ColumnProfiler::profile_columns(&df).unwrap();
        assert_eq!(profiles[0].top_values.len(), TOP_VALUES);
        assert_eq!(profiles[0].unique_count, 7);
    }

    #[test]
    fn test_empty_frame_has_no_profiles() {
        let df = df! { "n" => Vec::<i64>::new() }.unwrap();
        assert!(ColumnProfiler::profile_columns(&df).unwrap().is_empty());
    }
}
