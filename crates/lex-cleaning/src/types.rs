use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize, Serializer};

/// Rendering used wherever a timestamp is turned into text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell, viewed independently of the column's storage type.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Absent,
    Integer(i64),
    Number(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Cell {
    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }

    /// Text rendering, `None` for absent cells and non-finite numbers.
    pub fn render(&self) -> Option<String> {
        match self {
            Cell::Absent => None,
            Cell::Integer(n) => Some(n.to_string()),
            Cell::Number(n) if !n.is_finite() => None,
            Cell::Number(n) => Some(n.to_string()),
            Cell::Text(s) => Some(s.clone()),
            Cell::Timestamp(ts) => Some(ts.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Cell::Absent => serializer.serialize_none(),
            Cell::Integer(n) => serializer.serialize_i64(*n),
            Cell::Number(n) if !n.is_finite() => serializer.serialize_none(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Timestamp(ts) => serializer.collect_str(&ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Numeric,
    Date,
    Text,
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SemanticType::Numeric => "numeric",
            SemanticType::Date => "date",
            SemanticType::Text => "text",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub declared_type: SemanticType,
    pub missing_count: usize,
    pub unique_count: usize,
    /// Most frequent values, count descending, ties by first appearance.
    pub top_values: Vec<ValueCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub column_x: String,
    pub column_y: String,
    pub value: f64,
}

/// Structured reading of a natural-language filter request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterInterpretation {
    /// e.g. `Age > 30`; empty when nothing could be interpreted
    pub filter_string: String,
    pub explanation: String,
}

impl FilterInterpretation {
    pub fn is_empty(&self) -> bool {
        self.filter_string.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Ingestion,
    TypeInference,
    Imputation,
    FuzzyCorrection,
    Deduplication,
    PiiMasking,
    AnomalyDetection,
    QualityScoring,
    ArtifactGeneration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    /// The stage failed and the frame from before it was kept.
    Degraded { reason: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageKind,
    #[serde(flatten)]
    pub status: StageStatus,
    pub notes: Vec<String>,
}

impl StageReport {
    pub fn completed(stage: StageKind, notes: Vec<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            notes,
        }
    }

    pub fn degraded(stage: StageKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            stage,
            notes: vec![format!("Stage degraded: {}", reason)],
            status: StageStatus::Degraded { reason },
        }
    }

    pub fn skipped(stage: StageKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            stage,
            notes: vec![reason.clone()],
            status: StageStatus::Skipped { reason },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, StageStatus::Degraded { .. })
    }
}

/// The user-facing report produced by one pipeline run.
///
/// Built once at the end of [`Pipeline::process`](crate::Pipeline::process)
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsBundle {
    pub rows_original: usize,
    pub rows_cleaned: usize,
    pub duplicates_removed: usize,
    pub anomalies_detected: usize,
    pub pii_masked: usize,
    pub quality_score: f64,
    pub logs: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub summary: String,
    pub sql: String,
    pub column_profiles: Vec<ColumnProfile>,
    pub correlations: Vec<CorrelationEntry>,
    pub previously_seen: bool,
    pub content_hash: String,
    pub stage_reports: Vec<StageReport>,
}

/// One JSON object per row, keyed by column name.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A file handed to the pipeline.
#[derive(Debug, Clone)]
pub struct CleaningRequest {
    pub filename: String,
    pub content: Vec<u8>,
    pub mask_pii: bool,
}

impl CleaningRequest {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            mask_pii: false,
        }
    }

    pub fn with_pii_masking(mut self, mask_pii: bool) -> Self {
        self.mask_pii = mask_pii;
        self
    }
}

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct CleaningResult {
    /// The frame as ingested, before any cleaning.
    pub original: DataFrame,
    pub cleaned: DataFrame,
    pub insights: InsightsBundle,
    /// First rows of the cleaned frame, ready for charting.
    pub preview: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_cell_serialization() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let cells = vec![
            Cell::Absent,
            Cell::Integer(9_007_199_254_740_993),
            Cell::Number(3.0),
            Cell::Number(2.5),
            Cell::Number(f64::NAN),
            Cell::Text("Mango".to_string()),
            Cell::Timestamp(ts),
        ];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(
            json,
            r#"[null,9007199254740993,3,2.5,null,"Mango","2024-03-01 00:00:00"]"#
        );
    }

    #[test]
    fn test_stage_report_serialization() {
        let report = StageReport::degraded(StageKind::PiiMasking, "regex failure");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stage"], "pii_masking");
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["reason"], "regex failure");
        assert!(report.is_degraded());
    }

    #[test]
    fn test_request_defaults_to_no_masking() {
        let request = CleaningRequest::new("data.csv", b"a\n1\n".to_vec());
        assert!(!request.mask_pii);
        assert!(request.with_pii_masking(true).mask_pii);
    }
}
