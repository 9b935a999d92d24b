//! File ingestion.
//!
//! Turns an uploaded `(filename, bytes)` pair into a [`DataFrame`]. The
//! extension decides the decoder:
//!
//! - `.csv`: polars CSV reader, UTF-8 first, Latin-1 when the bytes are not UTF-8
//! - `.xlsx`: first worksheet via `calamine`
//!
//! Ingestion is the only stage whose failure aborts a pipeline run.

mod csv;
mod xlsx;

pub use csv::TextEncoding;

use crate::error::{CleaningError, Result};
use crate::utils::{is_datetime_dtype, is_numeric_dtype};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Detect the format from a filename's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            "" => Err(CleaningError::ingestion_msg(format!(
                "'{}' has no file extension (expected .csv or .xlsx)",
                filename
            ))),
            other => Err(CleaningError::ingestion_msg(format!(
                "unsupported file type '.{}' (expected .csv or .xlsx)",
                other
            ))),
        }
    }
}

/// Decodes uploads into frames.
pub struct Ingestor;

impl Ingestor {
    /// Decode `content` according to the extension of `filename`.
    ///
    /// Returns the frame plus log notes describing how it was read.
    pub fn ingest(&self, filename: &str, content: &[u8]) -> Result<(DataFrame, Vec<String>)> {
        let mut notes = Vec::new();

        let df = match FileFormat::from_filename(filename)? {
            FileFormat::Csv => {
                let (df, encoding) = csv::read_csv(content)?;
                if encoding == TextEncoding::Latin1 {
                    notes.push("Decoded file as Latin-1 (content was not valid UTF-8)".to_string());
                }
                df
            }
            FileFormat::Xlsx => xlsx::read_xlsx(content)?,
        };

        let df = normalize_storage_types(df)
            .map_err(|e| CleaningError::ingestion(e.to_string(), e))?;

        info!(
            "Ingested '{}': {} rows x {} columns",
            filename,
            df.height(),
            df.width()
        );
        notes.push(format!(
            "Loaded {} rows and {} columns from {}",
            df.height(),
            df.width(),
            filename
        ));

        Ok((df, notes))
    }
}

/// Cast anything that is neither numeric, calendar nor text (booleans,
/// durations, times) to text so downstream stages see three kinds only.
fn normalize_storage_types(mut df: DataFrame) -> PolarsResult<DataFrame> {
    let to_cast: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| {
            let dtype = c.dtype();
            !is_numeric_dtype(dtype) && !is_datetime_dtype(dtype) && dtype != &DataType::String
        })
        .map(|c| c.name().to_string())
        .collect();

    for name in to_cast {
        debug!("Casting column '{}' to text", name);
        let casted = df
            .column(&name)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        df.replace(&name, casted)?;
    }

    Ok(df)
}
