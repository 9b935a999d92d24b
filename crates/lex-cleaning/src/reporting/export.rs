//! Serialisation of cleaned frames for download.

use crate::types::{CleaningResult, Record, TIMESTAMP_FORMAT};
use crate::utils::{column_names, frame_to_cells};
use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Output formats offered for a cleaned frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Sql,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Sql => "sql",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "sql" => Ok(Self::Sql),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

/// CSV bytes with a header row; timestamps use the shared text rendering.
pub fn export_csv(df: &DataFrame) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut df = df.clone();
    CsvWriter::new(&mut out)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .with_datetime_format(Some(TIMESTAMP_FORMAT.to_string()))
        .finish(&mut df)?;
    Ok(out)
}

/// Up to `limit` rows as JSON objects keyed by column name.
pub fn preview_records(df: &DataFrame, limit: usize) -> Result<Vec<Record>> {
    let head = df.head(Some(limit));
    let names = column_names(&head);
    let columns = frame_to_cells(&head)?;

    let mut records = Vec::with_capacity(head.height());
    for row in 0..head.height() {
        let mut record = Record::new();
        for (name, column) in names.iter().zip(&columns) {
            record.insert(name.clone(), serde_json::to_value(&column[row])?);
        }
        records.push(record);
    }
    Ok(records)
}

/// Every row as a JSON array of objects. Non-finite numbers become `null`.
pub fn export_json_records(df: &DataFrame) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut df = df.clone();
    JsonWriter::new(&mut out)
        .with_json_format(JsonFormat::Json)
        .finish(&mut df)?;
    Ok(out)
}

impl CleaningResult {
    /// The cleaned frame in the requested format.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>> {
        match format {
            ExportFormat::Csv => export_csv(&self.cleaned),
            ExportFormat::Json => export_json_records(&self.cleaned),
            ExportFormat::Sql => Ok(self.insights.sql.clone().into_bytes()),
        }
    }
}
