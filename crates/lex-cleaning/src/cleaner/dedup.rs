//! Exact duplicate row removal.

use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Drops rows that repeat an earlier row across all columns.
pub struct Deduplicator;

impl Deduplicator {
    /// Keep the first occurrence of every row, preserving order.
    ///
    /// Two missing cells compare equal. Returns the frame and how many rows
    /// were dropped.
    pub fn remove_duplicates(&self, df: DataFrame) -> Result<(DataFrame, usize)> {
        if df.width() == 0 || df.height() < 2 {
            return Ok((df, 0));
        }

        let before = df.height();
        let unique = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
        let removed = before - unique.height();
        if removed == 0 {
            return Ok((df, 0));
        }

        debug!("Dropping {} duplicate rows", removed);
        Ok((unique, removed))
    }
}
