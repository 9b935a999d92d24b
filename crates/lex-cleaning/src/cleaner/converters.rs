//! Value parsers used by type coercion.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Month-first forms tried by the generic pass, with a time component.
const GENERIC_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Month-first forms tried by the generic pass, date only.
const GENERIC_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%m.%d.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const DAY_FIRST_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d/%m/%y", "%d.%m.%Y", "%d-%m-%y"];

/// The fixed list tried, in order, once both generic passes have given up.
pub const EXPLICIT_DATE_FORMATS: [&str; 6] = [
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%b %d %Y",
    "%d-%b-%Y",
];

/// Currency symbols stripped by the currency-aware numeric parser.
pub const CURRENCY_SYMBOLS: [char; 4] = ['₹', '$', '€', '£'];

/// The three passes of the date cascade, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePass {
    Generic,
    DayFirst,
    Explicit,
}

impl DatePass {
    pub const ALL: [DatePass; 3] = [DatePass::Generic, DatePass::DayFirst, DatePass::Explicit];

    /// Try to parse a single value with this pass only.
    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match self {
            DatePass::Generic => DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.naive_utc())
                .ok()
                .or_else(|| parse_with(value, GENERIC_DATETIME_FORMATS, GENERIC_DATE_FORMATS)),
            DatePass::DayFirst => {
                parse_with(value, DAY_FIRST_DATETIME_FORMATS, DAY_FIRST_DATE_FORMATS)
            }
            DatePass::Explicit => parse_with(value, &[], &EXPLICIT_DATE_FORMATS),
        }
    }
}

fn parse_with(value: &str, datetime_formats: &[&str], date_formats: &[&str]) -> Option<NaiveDateTime> {
    datetime_formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            date_formats.iter().find_map(|fmt| {
                NaiveDate::parse_from_str(value, fmt)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
        })
}

/// Run the cascade over a column. Each pass only sees the cells that earlier
/// passes left unparsed. Returns the parsed cells and how many each pass took.
pub fn parse_date_cascade(values: &[Option<&str>]) -> (Vec<Option<NaiveDateTime>>, [usize; 3]) {
    let mut parsed: Vec<Option<NaiveDateTime>> = vec![None; values.len()];
    let mut per_pass = [0usize; 3];

    for (pass_idx, pass) in DatePass::ALL.iter().enumerate() {
        for (slot, value) in parsed.iter_mut().zip(values) {
            if slot.is_some() {
                continue;
            }
            if let Some(v) = value
                && let Some(ts) = pass.parse(v)
            {
                *slot = Some(ts);
                per_pass[pass_idx] += 1;
            }
        }
    }

    (parsed, per_pass)
}

/// Plain numeric parse; non-finite results count as failures.
pub fn parse_plain_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Currency-aware parse: strips currency symbols, thousands separators and
/// whitespace, and reads a trailing `k`/`K` as thousands.
pub fn parse_currency_number(value: &str) -> Option<f64> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();

    let (digits, multiplier) = match cleaned.strip_suffix(['k', 'K']) {
        Some(stripped) => (stripped, 1000.0),
        None => (cleaned.as_str(), 1.0),
    };

    parse_plain_number(digits).map(|v| v * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_generic_pass_prefers_month_first() {
        assert_eq!(DatePass::Generic.parse("01/02/2024"), Some(day(2024, 1, 2)));
        assert_eq!(DatePass::Generic.parse("2024-03-15"), Some(day(2024, 3, 15)));
        assert_eq!(DatePass::Generic.parse("13/02/2024"), None);
    }

    #[test]
    fn test_day_first_pass() {
        assert_eq!(DatePass::DayFirst.parse("13/02/2024"), Some(day(2024, 2, 13)));
    }

    #[test]
    fn test_explicit_formats() {
        assert_eq!(DatePass::Explicit.parse("Mar 05 2024"), Some(day(2024, 3, 5)));
        assert_eq!(DatePass::Explicit.parse("05-Mar-2024"), Some(day(2024, 3, 5)));
        assert_eq!(DatePass::Explicit.parse("2024/03/05"), Some(day(2024, 3, 5)));
    }

    #[test]
    fn test_cascade_only_retries_unparsed_cells() {
        let values = vec![
            Some("2024-01-05"),
            Some("25/12/2023"),
            Some("07-Jan-2024"),
            Some("not a date"),
            None,
        ];
        let (parsed, per_pass) = parse_date_cascade(&values);
        assert_eq!(parsed[0], Some(day(2024, 1, 5)));
        assert_eq!(parsed[1], Some(day(2023, 12, 25)));
        assert_eq!(parsed[2], Some(day(2024, 1, 7)));
        assert_eq!(parsed[3], None);
        assert_eq!(parsed[4], None);
        assert_eq!(per_pass, [1, 1, 1]);
    }

    #[test]
    fn test_numeric_parsers() {
        assert_eq!(parse_plain_number(" 42.5 "), Some(42.5));
        assert_eq!(parse_plain_number("$10"), None);
        assert_eq!(parse_plain_number("NaN"), None);
        assert_eq!(parse_currency_number("$1,200"), Some(1200.0));
        assert_eq!(parse_currency_number("₹ 5k"), Some(5000.0));
        assert_eq!(parse_currency_number("£2.5K"), Some(2500.0));
        assert_eq!(parse_currency_number("€ 99"), Some(99.0));
        assert_eq!(parse_currency_number("abc"), None);
    }
}
