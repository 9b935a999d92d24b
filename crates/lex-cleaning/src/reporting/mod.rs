//! Artifacts produced from a cleaned frame.
//!
//! - [`SqlGenerator`] writes a `CREATE TABLE` statement and sample inserts
//! - [`export`] turns the frame into CSV or JSON bytes and builds the
//!   chart-ready row preview

pub mod export;
pub mod sql;

pub use export::{ExportFormat, export_csv, export_json_records, preview_records};
pub use sql::{SqlGenerator, normalize_identifier};
