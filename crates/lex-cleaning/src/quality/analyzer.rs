use crate::utils::round_to;
use serde::{Deserialize, Serialize};

/// Coarse band a score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Excellent,
    Fair,
    Critical,
}

impl QualityTier {
    pub fn from_score(score: f64) -> Self {
        if score > 90.0 {
            Self::Excellent
        } else if score > 70.0 {
            Self::Fair
        } else {
            Self::Critical
        }
    }

    fn sentence(&self) -> &'static str {
        match self {
            Self::Excellent => "The data quality is excellent. ",
            Self::Fair => "The data quality is good, though some cleaning was required. ",
            Self::Critical => "The data quality is poor. ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: f64,
    pub tier: QualityTier,
    pub summary: String,
}

/// Counts that feed the score and the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer {
    pub rows_original: usize,
    pub rows_cleaned: usize,
    pub duplicates_removed: usize,
    pub anomalies_detected: usize,
    pub pii_masked: usize,
}

impl QualityScorer {
    /// Share of rows kept, as a percentage rounded to two decimals. A file
    /// without rows scores 0.
    pub fn score(&self) -> f64 {
        if self.rows_original == 0 {
            return 0.0;
        }
        let removed = self.rows_original.saturating_sub(self.rows_cleaned) as f64;
        let raw = 100.0 - 100.0 * removed / self.rows_original as f64;
        round_to(raw.clamp(0.0, 100.0), 2)
    }

    /// Percentage of rows filtered out, one decimal.
    pub fn loss_percentage(&self) -> f64 {
        if self.rows_original == 0 {
            return 0.0;
        }
        let removed = self.rows_original.saturating_sub(self.rows_cleaned) as f64;
        round_to(100.0 * removed / self.rows_original as f64, 1)
    }

    pub fn report(&self) -> QualityReport {
        let score = self.score();
        let tier = QualityTier::from_score(score);

        let mut summary = format!(
            "The dataset initially contained {} rows. ",
            self.rows_original
        );
        summary.push_str(tier.sentence());

        let mut findings = Vec::new();
        if self.duplicates_removed > 0 {
            findings.push(format!("{} duplicates", self.duplicates_removed));
        }
        if self.anomalies_detected > 0 {
            findings.push(format!("{} statistical anomalies", self.anomalies_detected));
        }
        if self.pii_masked > 0 {
            findings.push(format!("{} sensitive values", self.pii_masked));
        }
        if !findings.is_empty() {
            summary.push_str(&format!("We detected {}. ", findings.join(" and ")));
        }
        summary.push_str(&format!(
            "In total, {}% of the data was filtered.",
            self.loss_percentage()
        ));

        QualityReport {
            score,
            tier,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_score_from_row_counts() {
        let scorer = QualityScorer {
            rows_original: 200,
            rows_cleaned: 187,
            ..Default::default()
        };
        assert_eq!(scorer.score(), 93.5);
        assert_eq!(scorer.loss_percentage(), 6.5);
    }

    #[test]
    fn test_zero_rows_scores_zero() {
        let report = QualityScorer::default().report();
        assert_eq!(report.score, 0.0);
        assert_eq!(report.tier, QualityTier::Critical);
    }

    #[test]
    fn test_score_rounding() {
        let scorer = QualityScorer {
            rows_original: 3,
            rows_cleaned: 2,
            ..Default::default()
        };
        assert_eq!(scorer.score(), 66.67);
    }

    #[test]
    fn test_tiers() {
        assert_eq!(QualityTier::from_score(95.0), QualityTier::Excellent);
        assert_eq!(QualityTier::from_score(90.0), QualityTier::Fair);
        assert_eq!(QualityTier::from_score(70.0), QualityTier::Critical);
    }

    #[test]
    fn test_summary_mentions_non_zero_counts() {
        let report = QualityScorer {
            rows_original: 10,
            rows_cleaned: 8,
            duplicates_removed: 2,
            anomalies_detected: 0,
            pii_masked: 3,
        }
        .report();
        assert_eq!(
            report.summary,
            "The dataset initially contained 10 rows. The data quality is good, though some \
             cleaning was required. We detected 2 duplicates and 3 sensitive values. In total, \
             20% of the data was filtered."
        );
    }

    #[test]
    fn test_clean_file_summary() {
        let report = QualityScorer {
            rows_original: 4,
            rows_cleaned: 4,
            ..Default::default()
        }
        .report();
        assert_eq!(report.score, 100.0);
        assert_eq!(
            report.summary,
            "The dataset initially contained 4 rows. The data quality is excellent. In total, 0% \
             of the data was filtered."
        );
    }
}
