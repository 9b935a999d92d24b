//! Natural-language row filters.
//!
//! Turns a phrase like "show rows where Age greater than 30" into the filter
//! expression `Age > 30`. The interpreter is keyword driven: it finds a
//! column name, a comparison keyword and a comparand, and gives up with an
//! explanation when any of them is missing. [`apply_filter`] evaluates an
//! interpreted filter against a frame.

use crate::error::{CleaningError, Result, ResultExt};
use crate::types::{Cell, FilterInterpretation};
use crate::utils::series_to_cells;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::cmp::Ordering;
use tracing::debug;

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("Invalid regex: number"));

/// `<column> <op> <number | 'text'>`, the shape [`NlQueryInterpreter`] emits.
static FILTER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<column>.+) (?P<op>[=<>]) (?:(?P<number>-?\d+(?:\.\d+)?)|'(?P<text>(?:[^']|'')*)')$")
        .expect("Invalid regex: filter")
});

const EQUAL_WORDS: [&str; 3] = ["equal", "equals", "exactly"];
const GREATER_WORDS: [&str; 5] = ["greater", "more", "above", "over", "higher"];
const LESS_WORDS: [&str; 4] = ["less", "lower", "under", "below"];

/// Connectives skipped when looking for a text comparand.
const FILLER_WORDS: [&str; 6] = ["than", "to", "is", "the", "where", "rows"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    Greater,
    Less,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Greater => ">",
            Self::Less => "<",
        }
    }

    fn phrase(&self) -> &'static str {
        match self {
            Self::Equal => "equal to",
            Self::Greater => "greater than",
            Self::Less => "less than",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Self::Equal),
            ">" => Some(Self::Greater),
            "<" => Some(Self::Less),
            _ => None,
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => ordering == Ordering::Equal,
            Self::Greater => ordering == Ordering::Greater,
            Self::Less => ordering == Ordering::Less,
        }
    }

    /// Equality wins over the ordering keywords; no keyword means equality.
    fn from_words(words: &[String]) -> Self {
        let has = |list: &[&str]| words.iter().any(|w| list.contains(&w.as_str()));
        if has(&EQUAL_WORDS) {
            Self::Equal
        } else if has(&GREATER_WORDS) {
            Self::Greater
        } else if has(&LESS_WORDS) {
            Self::Less
        } else {
            Self::Equal
        }
    }
}

fn is_keyword(word: &str) -> bool {
    EQUAL_WORDS.contains(&word) || GREATER_WORDS.contains(&word) || LESS_WORDS.contains(&word)
}

/// Lower-cased words with surrounding punctuation removed.
fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

/// Interprets filter phrases against a known set of columns.
pub struct NlQueryInterpreter;

impl NlQueryInterpreter {
    /// Interpret `query` against `columns`. An empty `filter_string` in the
    /// result means the phrase could not be understood.
    pub fn interpret(query: &str, columns: &[String]) -> FilterInterpretation {
        let lowered = query.to_lowercase();

        let Some(column) = Self::match_column(&lowered, columns) else {
            return FilterInterpretation {
                filter_string: String::new(),
                explanation: "No known column name appears in the query".to_string(),
            };
        };

        // Drop the column name so digits inside it are not taken as values.
        let remainder = lowered.replacen(&column.to_lowercase(), " ", 1);
        let query_words = words(&remainder);
        let comparison = Comparison::from_words(&query_words);

        let value = match NUMBER_PATTERN.find_iter(&remainder).last() {
            Some(m) => m.as_str().to_string(),
            None => match Self::text_comparand(query, column) {
                Some(text) => format!("'{}'", text.replace('\'', "''")),
                None => {
                    return FilterInterpretation {
                        filter_string: String::new(),
                        explanation: format!("No value to compare {} against", column),
                    };
                }
            },
        };

        let filter_string = format!("{} {} {}", column, comparison.symbol(), value);
        debug!("Interpreted '{}' as '{}'", query, filter_string);
        FilterInterpretation {
            explanation: format!(
                "Showing rows where {} is {} {}",
                column,
                comparison.phrase(),
                value
            ),
            filter_string,
        }
    }

    /// Longest column name contained in the query, ignoring case.
    fn match_column<'a>(lowered_query: &str, columns: &'a [String]) -> Option<&'a String> {
        let mut candidates: Vec<&String> = columns
            .iter()
            .filter(|c| !c.is_empty() && lowered_query.contains(&c.to_lowercase()))
            .collect();
        candidates.sort_by_key(|c| std::cmp::Reverse(c.len()));
        candidates.into_iter().next()
    }

    /// Last word of the original query that is neither part of the column
    /// name, a comparison keyword nor a connective. Original casing is kept.
    fn text_comparand(query: &str, column: &str) -> Option<String> {
        let column_words = words(column);
        query
            .split_whitespace()
            .rev()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
            .find(|t| {
                let lower = t.to_lowercase();
                !column_words.contains(&lower)
                    && !is_keyword(&lower)
                    && !FILLER_WORDS.contains(&lower.as_str())
            })
            .map(str::to_string)
    }
}

enum Comparand {
    Number(f64),
    Text(String),
}

impl Comparand {
    /// How `cell` orders against the comparand. Numbers compare numerically,
    /// text and dates by their rendering (text ignoring case); absent cells
    /// and number/text mismatches never match.
    fn compare(&self, cell: &Cell) -> Option<Ordering> {
        match (self, cell) {
            (Self::Number(target), Cell::Integer(v)) => (*v as f64).partial_cmp(target),
            (Self::Number(target), Cell::Number(v)) => v.partial_cmp(target),
            (Self::Text(target), Cell::Text(s)) => {
                Some(s.to_lowercase().cmp(&target.to_lowercase()))
            }
            (Self::Text(target), Cell::Timestamp(_)) => {
                cell.render().map(|rendered| rendered.as_str().cmp(target.as_str()))
            }
            _ => None,
        }
    }
}

/// Keep the rows of `df` that satisfy `interpretation`.
///
/// An empty interpretation keeps every row.
///
/// # Errors
///
/// [`CleaningError::ColumnNotFound`] when the filtered column is not in `df`,
/// and [`CleaningError::Internal`] when the filter string is not one the
/// interpreter produces.
pub fn apply_filter(df: &DataFrame, interpretation: &FilterInterpretation) -> Result<DataFrame> {
    if interpretation.is_empty() {
        return Ok(df.clone());
    }

    let filter = interpretation.filter_string.as_str();
    let parts = FILTER_PATTERN
        .captures(filter)
        .ok_or_else(|| CleaningError::Internal(format!("Unrecognised filter '{}'", filter)))?;
    let column_name = &parts["column"];
    let comparison = Comparison::from_symbol(&parts["op"])
        .ok_or_else(|| CleaningError::Internal(format!("Unknown operator in '{}'", filter)))?;
    let comparand = match (parts.name("number"), parts.name("text")) {
        (Some(number), _) => Comparand::Number(number.as_str().parse().map_err(|_| {
            CleaningError::Internal(format!("Bad number in filter '{}'", filter))
        })?),
        (None, Some(text)) => Comparand::Text(text.as_str().replace("''", "'")),
        (None, None) => return Err(CleaningError::Internal(format!("No value in '{}'", filter))),
    };

    let column = df
        .column(column_name)
        .map_err(|_| CleaningError::ColumnNotFound(column_name.to_string()))?;
    let cells = series_to_cells(column.as_materialized_series()).context("Reading filter column")?;

    let keep: Vec<bool> = cells
        .iter()
        .map(|cell| {
            comparand
                .compare(cell)
                .is_some_and(|ordering| comparison.accepts(ordering))
        })
        .collect();
    debug!(
        "Filter '{}' keeps {} of {} rows",
        filter,
        keep.iter().filter(|k| **k).count(),
        keep.len()
    );

    df.filter(&BooleanChunked::from_slice("keep".into(), &keep))
        .context("Applying filter")
}
