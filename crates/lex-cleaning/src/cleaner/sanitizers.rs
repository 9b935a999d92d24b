//! Text normalization for categorical columns.

use anyhow::Result;
use polars::prelude::*;

/// Literal written into text cells that are missing or spell out "nothing".
pub const UNKNOWN: &str = "Unknown";

/// Title-cased spellings of missing values.
pub const NULL_SPELLINGS: [&str; 4] = ["Nan", "None", "Na", "N/A"];

/// Title-case a string: a letter is upper-cased when the previous character
/// is not a letter, lower-cased otherwise. Digits and punctuation both start
/// a new word, so `"1st o'neil"` becomes `"1St O'Neil"`.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_is_letter = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Trim, title-case and map null spellings (and absent cells) to [`UNKNOWN`].
pub fn normalize_text(value: Option<&str>) -> String {
    let Some(raw) = value else {
        return UNKNOWN.to_string();
    };
    let titled = title_case(raw.trim());
    if titled.is_empty() || NULL_SPELLINGS.contains(&titled.as_str()) {
        UNKNOWN.to_string()
    } else {
        titled
    }
}

/// Normalize every cell of a text series.
pub(crate) fn normalize_text_series(series: &Series) -> Result<Series> {
    let values: Vec<String> = series
        .str()?
        .into_iter()
        .map(normalize_text)
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("hello WORLD"), "Hello World");
        assert_eq!(title_case("new-york"), "New-York");
        assert_eq!(title_case("1st o'neil"), "1St O'Neil");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_null_spellings_become_unknown() {
        for raw in ["nan", "NONE", " na ", "n/a", ""] {
            assert_eq!(normalize_text(Some(raw)), UNKNOWN, "input {:?}", raw);
        }
        assert_eq!(normalize_text(None), UNKNOWN);
        assert_eq!(normalize_text(Some("  mango ")), "Mango");
        assert_eq!(normalize_text(Some("nana")), "Nana");
    }

    #[test]
    fn test_normalize_series() {
        let s = Series::new("fruit".into(), vec![Some(" apple"), None, Some("N/A")]);
        let out = normalize_text_series(&s).unwrap();
        let values: Vec<Option<&str>> = out.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("Apple"), Some("Unknown"), Some("Unknown")]);
    }
}
