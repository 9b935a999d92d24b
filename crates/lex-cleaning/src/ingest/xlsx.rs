//! XLSX decoding: first worksheet, first row as header.

use crate::error::{CleaningError, Result};
use crate::types::TIMESTAMP_FORMAT;
use crate::utils::{millis_from_timestamp, timestamp_dtype};
use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;

static EMPTY_CELL: Data = Data::Empty;

pub(crate) fn read_xlsx(bytes: &[u8]) -> Result<DataFrame> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| CleaningError::ingestion(e.to_string(), e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CleaningError::ingestion_msg("the workbook has no worksheets"))?
        .map_err(|e| CleaningError::ingestion(e.to_string(), e))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| CleaningError::ingestion_msg("the first worksheet is empty"))?;
    let names = header_names(header);
    let body: Vec<&[Data]> = rows.collect();

    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&EMPTY_CELL))
                .collect();
            build_column(name, &cells)
        })
        .collect::<PolarsResult<Vec<Column>>>()
        .map_err(|e| CleaningError::ingestion(e.to_string(), e))?;

    DataFrame::new(columns).map_err(|e| CleaningError::ingestion(e.to_string(), e))
}

/// Header labels, with blanks named by position and repeats suffixed `.1`, `.2`, ...
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match render(cell) {
                Some(label) if !label.trim().is_empty() => label.trim().to_string(),
                _ => format!("Unnamed: {}", idx),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            name
        })
        .collect()
}

fn excel_timestamp(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok(),
        _ => None,
    }
}

fn render(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        Data::DurationIso(s) => Some(s.clone()),
        other => excel_timestamp(other).map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()),
    }
}

/// Pick a storage type per column: numeric or timestamp when every
/// non-empty cell agrees, text otherwise.
fn build_column(name: &str, cells: &[&Data]) -> PolarsResult<Column> {
    let present: Vec<&&Data> = cells
        .iter()
        .filter(|c| !matches!(c, Data::Empty | Data::Error(_)))
        .collect();

    let all_int = !present.is_empty() && present.iter().all(|c| matches!(c, Data::Int(_)));
    let all_numeric = !present.is_empty()
        && present
            .iter()
            .all(|c| matches!(c, Data::Int(_) | Data::Float(_)));
    let all_dates = !present.is_empty() && present.iter().all(|c| excel_timestamp(c).is_some());

    let series = if all_int {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                Data::Int(i) => Some(*i),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values)
    } else if all_numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                Data::Int(i) => Some(*i as f64),
                Data::Float(f) => Some(*f),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values)
    } else if all_dates {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| excel_timestamp(c).map(|ts| millis_from_timestamp(&ts)))
            .collect();
        Series::new(name.into(), values).cast(&timestamp_dtype())?
    } else {
        let values: Vec<Option<String>> = cells.iter().map(|c| render(c)).collect();
        Series::new(name.into(), values)
    };

    Ok(series.into_column())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_fill_blanks_and_repeats() {
        let header = vec![
            Data::String("Name".to_string()),
            Data::Empty,
            Data::String("Name".to_string()),
        ];
        assert_eq!(
            header_names(&header),
            vec!["Name".to_string(), "Unnamed: 1".to_string(), "Name.1".to_string()]
        );
    }

    #[test]
    fn test_build_column_types() {
        let ints = [Data::Int(1), Data::Empty, Data::Int(3)];
        let refs: Vec<&Data> = ints.iter().collect();
        let col = build_column("n", &refs).unwrap();
        assert_eq!(col.dtype(), &DataType::Int64);
        assert_eq!(col.null_count(), 1);

        let mixed = [Data::Int(1), Data::Float(2.5)];
        let refs: Vec<&Data> = mixed.iter().collect();
        assert_eq!(build_column("f", &refs).unwrap().dtype(), &DataType::Float64);

        let text = [Data::Int(1), Data::String("two".to_string())];
        let refs: Vec<&Data> = text.iter().collect();
        assert_eq!(build_column("t", &refs).unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_garbage_bytes_are_an_ingestion_error() {
        let err = read_xlsx(b"definitely not a zip archive").unwrap_err();
        assert_eq!(err.error_code(), "INGESTION_FAILED");
    }
}
