//! Pearson correlation between numeric columns.

use crate::types::CorrelationEntry;
use crate::utils::{numeric_column_names, round_to};
use anyhow::Result;
use polars::prelude::*;

/// Pearson correlation over the rows where both values are present and
/// finite.
///
/// Returns 0.0 when either side has zero variance or fewer than two paired
/// values exist.
pub(crate) fn pearson(x: &Float64Chunked, y: &Float64Chunked) -> f64 {
    // null entries in the mask count as false
    let paired = x.is_finite() & y.is_finite();
    let (Ok(x), Ok(y)) = (x.filter(&paired), y.filter(&paired)) else {
        return 0.0;
    };
    if x.len() < 2 {
        return 0.0;
    }

    match cov::pearson_corr(&x, &y) {
        Some(r) if r.is_finite() => r.clamp(-1.0, 1.0),
        _ => 0.0,
    }
}

/// Flat correlation matrix over every ordered pair of numeric columns,
/// self-pairs included, rounded to two decimals.
///
/// Empty when the frame has no rows or fewer than two numeric columns.
pub fn correlation_matrix(df: &DataFrame) -> Result<Vec<CorrelationEntry>> {
    let names = numeric_column_names(df);
    if df.height() == 0 || names.len() < 2 {
        return Ok(Vec::new());
    }

    let mut values: Vec<Float64Chunked> = Vec::with_capacity(names.len());
    for name in &names {
        let floats = df
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        values.push(floats.f64()?.clone());
    }

    let mut entries = Vec::with_capacity(names.len() * names.len());
    for (i, x) in names.iter().enumerate() {
        for (j, y) in names.iter().enumerate() {
            let value = if i == j {
                1.0
            } else {
                round_to(pearson(&values[i], &values[j]), 2)
            };
            entries.push(CorrelationEntry {
                column_x: x.clone(),
                column_y: y.clone(),
                value,
            });
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Float64Chunked {
        Float64Chunked::from_slice("v".into(), values)
    }

    #[test]
    fn test_pearson_perfect() {
        let x = some(&[1.0, 2.0, 3.0, 4.0]);
        let y = some(&[2.0, 4.0, 6.0, 8.0]);
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);

        let neg = some(&[8.0, 6.0, 4.0, 2.0]);
        assert!((pearson(&x, &neg) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_zero_variance() {
        let x = some(&[1.0, 2.0, 3.0]);
        let flat = some(&[5.0, 5.0, 5.0]);
        assert_eq!(pearson(&x, &flat), 0.0);
    }

    #[test]
    fn test_pearson_skips_missing_pairs() {
        let x = Float64Chunked::from_slice_options(
            "x".into(),
            &[Some(1.0), None, Some(3.0), Some(5.0), Some(f64::NAN)],
        );
        let y = Float64Chunked::from_slice_options(
            "y".into(),
            &[Some(1.0), Some(100.0), Some(3.0), Some(5.0), Some(-40.0)],
        );
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let df = df! {
            "a" => [1.0, 2.0, 3.0, 4.0],
            "b" => [2.0, 1.0, 4.0, 3.0],
            "c" => [7i64, 7, 7, 7],
            "name" => ["w", "x", "y", "z"],
        }
        .unwrap();
        let entries = correlation_matrix(&df).unwrap();
        assert_eq!(entries.len(), 9);

        let lookup = |x: &str, y: &str| {
            entries
                .iter()
                .find(|e| e.column_x == x && e.column_y == y)
                .map(|e| e.value)
                .unwrap()
        };
        for name in ["a", "b", "c"] {
            assert_eq!(lookup(name, name), 1.0);
        }
        assert_eq!(lookup("a", "b"), lookup("b", "a"));
        assert_eq!(lookup("a", "b"), 0.6);
        assert_eq!(lookup("a", "c"), 0.0);
    }

    #[test]
    fn test_matrix_empty_cases() {
        let one = df! { "a" => [1.0, 2.0], "t" => ["x", "y"] }.unwrap();
        assert!(correlation_matrix(&one).unwrap().is_empty());

        let empty = df! { "a" => Vec::<f64>::new(), "b" => Vec::<f64>::new() }.unwrap();
        assert!(correlation_matrix(&empty).unwrap().is_empty());
    }
}
