//! CSV decoding with a Latin-1 fallback.

use crate::error::{CleaningError, Result};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::borrow::Cow;
use std::io::Cursor;
use tracing::debug;

/// Text encoding a CSV upload was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Latin1 => "Latin-1",
        }
    }
}

/// Decode raw bytes into text, falling back to Latin-1 when they are not UTF-8.
pub(crate) fn decode_text(bytes: &[u8]) -> (Cow<'_, str>, TextEncoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (
            Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
            TextEncoding::Utf8,
        ),
        // Every byte sequence is valid Latin-1, so this never fails.
        Err(_) => (encoding_rs::mem::decode_latin1(bytes), TextEncoding::Latin1),
    }
}

/// Read a CSV upload into a frame, with a header row and full-scan schema inference.
pub(crate) fn read_csv(bytes: &[u8]) -> Result<(DataFrame, TextEncoding)> {
    let (text, encoding) = decode_text(bytes);
    if text.trim().is_empty() {
        return Err(CleaningError::ingestion_msg("the file is empty"));
    }

    debug!("Decoding CSV as {}", encoding.label());

    let cursor = Cursor::new(text.into_owned().into_bytes());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(cursor)
        .finish()
        .map_err(|e| CleaningError::ingestion(e.to_string(), e))?;

    Ok((df, encoding))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_utf8_csv() {
        let (df, encoding) = read_csv(b"Name,Age\nAlice,30\nBob,\n").unwrap();
        assert_eq!(encoding, TextEncoding::Utf8);
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.column("Age").unwrap().null_count(), 1);
    }

    #[test]
    fn test_latin1_fallback() {
        // "Café" with a Latin-1 encoded e-acute
        let bytes = b"City,Score\nCaf\xe9,1\nParis,2\n";
        let (df, encoding) = read_csv(bytes).unwrap();
        assert_eq!(encoding, TextEncoding::Latin1);
        let city = df.column("City").unwrap();
        let first = city.as_materialized_series().str().unwrap().get(0);
        assert_eq!(first, Some("Café"));
    }

    #[test]
    fn test_bom_is_stripped() {
        let (df, _) = read_csv("\u{feff}Id,Value\n1,2\n".as_bytes()).unwrap();
        assert!(df.column("Id").is_ok());
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let err = read_csv(b"   \n").unwrap_err();
        assert_eq!(err.error_code(), "INGESTION_FAILED");
    }

    #[test]
    fn test_header_only_file_has_zero_rows() {
        let (df, _) = read_csv(b"a,b,c\n").unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 3);
    }
}
