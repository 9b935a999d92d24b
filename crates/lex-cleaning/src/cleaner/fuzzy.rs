//! Fuzzy correction of misspelled categorical values.
//!
//! A rare spelling is rewritten to a much more frequent one when the two are
//! similar enough. Every pair of distinct values is compared, so the cost is
//! quadratic in the number of distinct values per column; columns that look
//! like free text (almost every value distinct) are skipped up front.

use crate::config::PipelineConfig;
use crate::utils::column_names;
use anyhow::Result;
use polars::prelude::*;
use similar::TextDiff;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Case-insensitive similarity in `[0, 1]`: twice the number of matching
/// characters over the combined length.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio() as f64
}

/// Distinct values with their counts, most frequent first; ties keep the
/// order of first appearance.
pub fn value_frequencies<'a, I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: HashMap<&'a str, (usize, usize)> = HashMap::new();
    for (idx, value) in values.into_iter().enumerate() {
        if let Some(v) = value {
            counts.entry(v).or_insert((0, idx)).0 += 1;
        }
    }
    let mut freqs: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(v, (count, first))| (v, count, first))
        .collect();
    freqs.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    freqs
        .into_iter()
        .map(|(v, count, _)| (v.to_string(), count))
        .collect()
}

/// Merges near-duplicate spellings in text columns.
pub struct FuzzyCorrector {
    similarity_threshold: f64,
    dominance_factor: f64,
    max_unique_ratio: f64,
}

impl Default for FuzzyCorrector {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl FuzzyCorrector {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            dominance_factor: config.dominance_factor,
            max_unique_ratio: config.max_unique_ratio,
        }
    }

    /// Correct every text column. A column that fails is left unchanged.
    pub fn correct_columns(&self, df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
        let mut df = df;
        let mut notes = Vec::new();

        for name in column_names(&df) {
            let series = df.column(&name)?.as_materialized_series().clone();
            if series.dtype() != &DataType::String {
                continue;
            }

            match self.correct_series(&series) {
                Ok(Some((corrected, applied))) => {
                    for (from, to) in &applied {
                        notes.push(format!("Corrected '{}' to '{}' in {}", from, to, name));
                    }
                    debug!("Applied {} corrections to '{}'", applied.len(), name);
                    df.replace(&name, corrected)?;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Fuzzy correction failed for '{}': {}", name, e);
                    notes.push(format!("Skipped fuzzy correction for {}: {}", name, e));
                }
            }
        }

        Ok((df, notes))
    }

    /// One column. Batches of corrections are applied until a round finds
    /// nothing more to merge, so running the corrector twice changes nothing.
    ///
    /// Returns `None` when the column was skipped or needed no change.
    pub fn correct_series(&self, series: &Series) -> Result<Option<(Series, Vec<(String, String)>)>> {
        let height = series.len();
        if height == 0 {
            return Ok(None);
        }

        let mut values: Vec<Option<String>> = series
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();

        let distinct = value_frequencies(values.iter().map(|v| v.as_deref())).len();
        if distinct as f64 / height as f64 > self.max_unique_ratio {
            debug!(
                "Skipping '{}': {} distinct values in {} rows",
                series.name(),
                distinct,
                height
            );
            return Ok(None);
        }

        let mut applied: Vec<(String, String)> = Vec::new();
        for _ in 0..distinct {
            let freqs = value_frequencies(values.iter().map(|v| v.as_deref()));
            let corrections = self.find_corrections(&freqs);
            if corrections.is_empty() {
                break;
            }

            let mapping: HashMap<&str, &str> = corrections
                .iter()
                .map(|(from, to)| (from.as_str(), to.as_str()))
                .collect();
            values = values
                .iter()
                .map(|v| {
                    v.as_deref()
                        .map(|s| mapping.get(s).copied().unwrap_or(s).to_string())
                })
                .collect();

            for pair in corrections {
                if !applied.contains(&pair) {
                    applied.push(pair);
                }
            }
        }

        if applied.is_empty() {
            return Ok(None);
        }
        Ok(Some((Series::new(series.name().clone(), values), applied)))
    }

    /// One round of pairwise comparison. For each value, the most frequent
    /// sufficiently similar and sufficiently dominant other value wins.
    pub fn find_corrections(&self, freqs: &[(String, usize)]) -> Vec<(String, String)> {
        let mut corrections = Vec::new();
        for (rare, rare_count) in freqs {
            let target = freqs.iter().find(|(candidate, count)| {
                candidate != rare
                    && *count as f64 > self.dominance_factor * *rare_count as f64
                    && similarity_ratio(rare, candidate) > self.similarity_threshold
            });
            if let Some((to, _)) = target {
                corrections.push((rare.clone(), to.clone()));
            }
        }
        corrections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(series: &Series) -> Vec<Option<String>> {
        series
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_similarity_ratio() {
        assert!(similarity_ratio("Mango", "Mngo") > 0.75);
        assert!((similarity_ratio("MANGO", "mango") - 1.0).abs() < 1e-9);
        assert!(similarity_ratio("Mango", "Apple") < 0.75);
    }

    #[test]
    fn test_value_frequencies_order() {
        let values = vec![Some("b"), Some("a"), Some("a"), None, Some("c"), Some("b")];
        assert_eq!(
            value_frequencies(values),
            vec![
                ("b".to_string(), 2),
                ("a".to_string(), 2),
                ("c".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_rare_spelling_is_merged() {
        let s = Series::new(
            "fruit".into(),
            vec!["Mango", "Mngo", "Mango", "Mango", "Apple", "Apple", "Apple"],
        );
        let (out, applied) = FuzzyCorrector::default().correct_series(&s).unwrap().unwrap();
        assert_eq!(applied, vec![("Mngo".to_string(), "Mango".to_string())]);
        assert_eq!(out.n_unique().unwrap(), 2);
    }

    #[test]
    fn test_not_dominant_enough() {
        // 2 vs 3 is not more than twice as frequent
        let s = Series::new("fruit".into(), vec!["Mango", "Mango", "Mango", "Mngo", "Mngo"]);
        assert!(FuzzyCorrector::default().correct_series(&s).unwrap().is_none());
    }

    #[test]
    fn test_high_cardinality_column_is_skipped() {
        let s = Series::new(
            "names".into(),
            vec!["Alice", "Alicee", "Bob", "Carol", "Dave", "Erin", "Frank", "Grace", "Heidi", "Ivan", "Alice"],
        );
        // 10 distinct out of 11 rows
        assert!(FuzzyCorrector::default().correct_series(&s).unwrap().is_none());
    }

    #[test]
    fn test_correction_is_idempotent() {
        let s = Series::new(
            "city".into(),
            vec![
                "London", "London", "London", "London", "London", "London", "London",
                "Londn", "Londn", "Londonn", "Paris", "Paris", "Paris", "Pariss",
            ],
        );
        let corrector = FuzzyCorrector::default();
        let (once, _) = corrector.correct_series(&s).unwrap().unwrap();
        assert!(corrector.correct_series(&once).unwrap().is_none());
        assert_eq!(
            value_frequencies(strings(&once).iter().map(|v| v.as_deref())),
            vec![("London".to_string(), 10), ("Paris".to_string(), 4)]
        );
    }

    #[test]
    fn test_correct_columns_logs_once_per_correction() {
        let df = df! {
            "fruit" => ["Mango", "Mngo", "Mango", "Mango", "Mngo", "Mango", "Mango", "Mango"],
            "qty" => [1, 2, 3, 4, 5, 6, 7, 8],
        }
        .unwrap();
        let (df, notes) = FuzzyCorrector::default().correct_columns(df).unwrap();
        assert_eq!(notes, vec!["Corrected 'Mngo' to 'Mango' in fruit".to_string()]);
        let fruit = df.column("fruit").unwrap().as_materialized_series();
        assert_eq!(fruit.n_unique().unwrap(), 1);
    }
}
