//! Masking of personally identifying values in text columns.
//!
//! Two kinds of value are recognised, e-mail addresses and North American
//! style phone numbers. Each cell is checked against both patterns on its
//! original value, so a cell holding an address and a number counts twice.

use crate::utils::column_names;
use anyhow::Result;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::{Captures, Regex};
use tracing::{debug, warn};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9._%+-]+)@([A-Za-z0-9.-]+\.[A-Za-z]{2,})")
        .expect("Invalid regex: email")
});

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}")
        .expect("Invalid regex: phone")
});

/// Replacement for every matched phone number.
pub const PHONE_MASK: &str = "***-***-****";

/// Result of masking one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedCell {
    pub value: String,
    /// Number of patterns that matched (0, 1 or 2).
    pub hits: usize,
}

/// Mask one value. Addresses keep their first character and their domain.
pub fn mask_value(value: &str) -> MaskedCell {
    let has_email = EMAIL_PATTERN.is_match(value);
    let has_phone = PHONE_PATTERN.is_match(value);
    let hits = usize::from(has_email) + usize::from(has_phone);
    if hits == 0 {
        return MaskedCell {
            value: value.to_string(),
            hits,
        };
    }

    let mut masked = value.to_string();
    if has_email {
        masked = EMAIL_PATTERN
            .replace_all(&masked, |caps: &Captures| {
                let first: String = caps[1].chars().take(1).collect();
                format!("{}***@{}", first, &caps[2])
            })
            .into_owned();
    }
    if has_phone {
        masked = PHONE_PATTERN.replace_all(&masked, PHONE_MASK).into_owned();
    }

    MaskedCell {
        value: masked,
        hits,
    }
}

/// Scans text columns and redacts e-mail addresses and phone numbers.
pub struct PiiMasker;

impl PiiMasker {
    /// Mask every text column. Returns the frame, the total hit count and
    /// one note per column that had something masked.
    pub fn mask_columns(&self, df: DataFrame) -> Result<(DataFrame, usize, Vec<String>)> {
        let mut df = df;
        let mut total = 0;
        let mut notes = Vec::new();

        for name in column_names(&df) {
            let series = df.column(&name)?.as_materialized_series().clone();
            if series.dtype() != &DataType::String {
                continue;
            }

            match Self::mask_series(&series) {
                Ok((masked, hits)) if hits > 0 => {
                    debug!("Masked {} values in '{}'", hits, name);
                    df.replace(&name, masked)?;
                    notes.push(format!("Masked {} sensitive values in {}", hits, name));
                    total += hits;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("PII scan failed for '{}': {}", name, e);
                    notes.push(format!("Skipped PII masking for {}: {}", name, e));
                }
            }
        }

        Ok((df, total, notes))
    }

    fn mask_series(series: &Series) -> Result<(Series, usize)> {
        let mut hits = 0;
        let values: Vec<Option<String>> = series
            .str()?
            .into_iter()
            .map(|v| {
                v.map(|s| {
                    let cell = mask_value(s);
                    hits += cell.hits;
                    cell.value
                })
            })
            .collect();
        Ok((Series::new(series.name().clone(), values), hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_email_keeps_first_char_and_domain() {
        let cell = mask_value("john@example.com");
        assert_eq!(cell.value, "j***@example.com");
        assert_eq!(cell.hits, 1);
    }

    #[test]
    fn test_phone_layouts() {
        for raw in ["123-456-7890", "(123) 456-7890", "+1 123.456.7890", "1234567890"] {
            let cell = mask_value(raw);
            assert_eq!(cell.value, PHONE_MASK, "input {:?}", raw);
            assert_eq!(cell.hits, 1);
        }
    }

    #[test]
    fn test_cell_with_both_counts_twice() {
        let cell = mask_value("mail a@b.io or call 555-123-4567");
        assert_eq!(cell.value, "mail a***@b.io or call ***-***-****");
        assert_eq!(cell.hits, 2);
    }

    #[test]
    fn test_plain_text_is_untouched() {
        let cell = mask_value("Mango");
        assert_eq!(cell, MaskedCell { value: "Mango".to_string(), hits: 0 });
    }

    #[test]
    fn test_mask_columns() {
        let df = df! {
            "contact" => [Some("john@example.com"), Some("123-456-7890"), None, Some("none")],
            "age" => [Some(30), Some(41), None, Some(22)],
        }
        .unwrap();
        let (df, total, notes) = PiiMasker.mask_columns(df).unwrap();
        assert_eq!(total, 2);
        assert_eq!(notes, vec!["Masked 2 sensitive values in contact".to_string()]);
        let contact: Vec<Option<&str>> = df
            .column("contact")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            contact,
            vec![Some("j***@example.com"), Some(PHONE_MASK), None, Some("none")]
        );
    }
}
