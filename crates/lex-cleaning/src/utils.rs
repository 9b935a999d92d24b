//! Shared utilities for the cleaning pipeline.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use crate::types::{Cell, SemanticType};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a DataType holds calendar values.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Map a storage dtype onto the three semantic column types.
pub fn semantic_type(dtype: &DataType) -> SemanticType {
    if is_numeric_dtype(dtype) {
        SemanticType::Numeric
    } else if is_datetime_dtype(dtype) {
        SemanticType::Date
    } else {
        SemanticType::Text
    }
}

/// The dtype every coerced date column ends up with.
pub fn timestamp_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

// =============================================================================
// Frame Utilities
// =============================================================================

/// Owned column names, in frame order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

/// Names of the columns whose storage type is numeric.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

/// Read a whole series as [`Cell`]s.
pub fn series_to_cells(series: &Series) -> PolarsResult<Vec<Cell>> {
    if is_integer_dtype(series.dtype()) {
        let ints = series.cast(&DataType::Int64)?;
        return Ok(ints
            .i64()?
            .into_iter()
            .map(|v| v.map(Cell::Integer).unwrap_or(Cell::Absent))
            .collect());
    }

    let cells = match semantic_type(series.dtype()) {
        SemanticType::Numeric => {
            let floats = series.cast(&DataType::Float64)?;
            floats
                .f64()?
                .into_iter()
                .map(|v| v.map(Cell::Number).unwrap_or(Cell::Absent))
                .collect()
        }
        SemanticType::Date => {
            let millis = series.cast(&timestamp_dtype())?.cast(&DataType::Int64)?;
            millis
                .i64()?
                .into_iter()
                .map(|v| {
                    v.and_then(timestamp_from_millis)
                        .map(Cell::Timestamp)
                        .unwrap_or(Cell::Absent)
                })
                .collect()
        }
        SemanticType::Text => {
            let strings = series.cast(&DataType::String)?;
            strings
                .str()?
                .into_iter()
                .map(|v| v.map(|s| Cell::Text(s.to_string())).unwrap_or(Cell::Absent))
                .collect()
        }
    };
    Ok(cells)
}

/// Read every column of a frame as cells, column-major.
pub fn frame_to_cells(df: &DataFrame) -> PolarsResult<Vec<Vec<Cell>>> {
    df.get_columns()
        .iter()
        .map(|c| series_to_cells(c.as_materialized_series()))
        .collect()
}

// =============================================================================
// Time Utilities
// =============================================================================

/// Convert epoch milliseconds into a naive (UTC) timestamp.
pub fn timestamp_from_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// Convert a naive timestamp into epoch milliseconds.
pub fn millis_from_timestamp(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_millis()
}

// =============================================================================
// Numeric Utilities
// =============================================================================

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_type() {
        assert_eq!(semantic_type(&DataType::Int64), SemanticType::Numeric);
        assert_eq!(semantic_type(&DataType::Float32), SemanticType::Numeric);
        assert_eq!(semantic_type(&timestamp_dtype()), SemanticType::Date);
        assert_eq!(semantic_type(&DataType::String), SemanticType::Text);
        assert_eq!(semantic_type(&DataType::Boolean), SemanticType::Text);
    }

    #[test]
    fn test_series_to_cells() {
        let s = Series::new("n".into(), vec![Some(1i64), None, Some(3)]);
        assert_eq!(
            series_to_cells(&s).unwrap(),
            vec![Cell::Integer(1), Cell::Absent, Cell::Integer(3)]
        );

        let s = Series::new("f".into(), vec![Some(1.5), None]);
        assert_eq!(
            series_to_cells(&s).unwrap(),
            vec![Cell::Number(1.5), Cell::Absent]
        );

        let s = Series::new("t".into(), vec![Some("a"), None]);
        assert_eq!(
            series_to_cells(&s).unwrap(),
            vec![Cell::Text("a".to_string()), Cell::Absent]
        );
    }

    #[test]
    fn test_large_integers_stay_exact() {
        let s = Series::new("id".into(), vec![9_007_199_254_740_992i64, 9_007_199_254_740_993]);
        let cells = series_to_cells(&s).unwrap();
        assert_ne!(cells[0], cells[1]);
        assert_eq!(cells[1].render().as_deref(), Some("9007199254740993"));
    }

    #[test]
    fn test_timestamp_cells() {
        let ms = 1_704_067_200_000i64; // 2024-01-01
        let s = Series::new("d".into(), vec![Some(ms), None])
            .cast(&timestamp_dtype())
            .unwrap();
        let cells = series_to_cells(&s).unwrap();
        match &cells[0] {
            Cell::Timestamp(ts) => assert_eq!(millis_from_timestamp(ts), ms),
            other => panic!("expected timestamp, got {:?}", other),
        }
        assert!(cells[1].is_absent());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.8566, 2), 0.86);
        assert_eq!(round_to(-0.333, 2), -0.33);
    }
}
