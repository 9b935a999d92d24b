//! Data cleaning stages that operate on column values.
//!
//! This module provides functionality for:
//! - Type inference and coercion of text columns
//! - Text normalization
//! - Fuzzy correction of misspelled categories
//! - Exact duplicate removal

mod converters;
mod dedup;
mod fuzzy;
mod sanitizers;
mod type_corrector;

pub use converters::{
    DatePass, parse_currency_number, parse_date_cascade, parse_plain_number, EXPLICIT_DATE_FORMATS,
};
pub use dedup::Deduplicator;
pub use fuzzy::{FuzzyCorrector, similarity_ratio, value_frequencies};
pub use sanitizers::{UNKNOWN, normalize_text, title_case};
pub use type_corrector::{TypeCoercer, is_date_like_name};
