//! Soft execution of individual stages.
//!
//! A stage receives the frame by value. If it fails, the frame it was given
//! is kept and the failure becomes a degraded [`StageReport`] instead of an
//! error.

use crate::types::{StageKind, StageReport, StageStatus};
use polars::prelude::DataFrame;
use tracing::{debug, warn};

/// Run `stage` on `frame`. On failure the input frame and `T::default()`
/// are returned alongside a degraded report.
pub(crate) fn run_stage<T, F>(kind: StageKind, frame: DataFrame, stage: F) -> (DataFrame, T, StageReport)
where
    T: Default,
    F: FnOnce(DataFrame) -> anyhow::Result<(DataFrame, T, Vec<String>)>,
{
    let fallback = frame.clone();
    match stage(frame) {
        Ok((frame, value, notes)) => {
            debug!("{:?} finished with {} notes", kind, notes.len());
            (frame, value, StageReport::completed(kind, notes))
        }
        Err(e) => {
            warn!("{:?} degraded: {:#}", kind, e);
            (fallback, T::default(), StageReport::degraded(kind, format!("{:#}", e)))
        }
    }
}

/// Collects stage reports and the user-facing log.
#[derive(Debug, Default)]
pub(crate) struct StageLog {
    logs: Vec<String>,
    reports: Vec<StageReport>,
}

impl StageLog {
    /// Extra line for the user log that belongs to no stage.
    pub fn note(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    /// Record a report. Notes of skipped stages stay in the report only.
    pub fn push(&mut self, report: StageReport) {
        if !matches!(report.status, StageStatus::Skipped { .. }) {
            self.logs.extend(report.notes.iter().cloned());
        }
        self.reports.push(report);
    }

    /// The log capped at `limit` lines, and every report in run order.
    pub fn finish(mut self, limit: usize) -> (Vec<String>, Vec<StageReport>) {
        self.logs.truncate(limit);
        (self.logs, self.reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failed_stage_keeps_input_frame() {
        let df = df! { "a" => [1, 2, 3] }.unwrap();
        let (frame, count, report) = run_stage::<usize, _>(StageKind::Deduplication, df, |df| {
            let _ = df.head(Some(1));
            Err(anyhow!("boom"))
        });
        assert_eq!(frame.height(), 3);
        assert_eq!(count, 0);
        assert!(report.is_degraded());
        assert_eq!(report.notes, vec!["Stage degraded: boom".to_string()]);
    }

    #[test]
    fn test_successful_stage_passes_through() {
        let df = df! { "a" => [1, 2, 3] }.unwrap();
        let (frame, count, report) = run_stage(StageKind::Deduplication, df, |df| {
            Ok((df.head(Some(2)), 1usize, vec!["Removed 1 duplicate rows".to_string()]))
        });
        assert_eq!(frame.height(), 2);
        assert_eq!(count, 1);
        assert_eq!(report.status, StageStatus::Completed);
    }

    #[test]
    fn test_log_skips_skipped_notes_and_truncates() {
        let mut log = StageLog::default();
        log.note("first");
        log.push(StageReport::completed(
            StageKind::TypeInference,
            vec!["second".to_string(), "third".to_string()],
        ));
        log.push(StageReport::skipped(StageKind::PiiMasking, "not requested"));
        let (logs, reports) = log.finish(2);
        assert_eq!(logs, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(reports.len(), 2);
    }
}
