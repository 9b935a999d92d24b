//! SQL script emission for the cleaned frame.

use crate::types::{Cell, TIMESTAMP_FORMAT};
use crate::utils::{frame_to_cells, is_datetime_dtype, is_integer_dtype, is_numeric_dtype};
use anyhow::Result;
use polars::prelude::*;

/// Replace the characters SQL identifiers cannot carry unquoted.
pub fn normalize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '-' | '.' => '_',
            other => other,
        })
        .collect()
}

fn sql_type(dtype: &DataType) -> &'static str {
    if is_integer_dtype(dtype) {
        "INT"
    } else if is_numeric_dtype(dtype) {
        "FLOAT"
    } else if is_datetime_dtype(dtype) {
        "TIMESTAMP"
    } else {
        "TEXT"
    }
}

fn sql_literal(cell: &Cell) -> String {
    match cell {
        Cell::Absent => "NULL".to_string(),
        Cell::Integer(v) => v.to_string(),
        Cell::Number(v) if !v.is_finite() => "NULL".to_string(),
        Cell::Number(v) => format!("{}", v),
        Cell::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Cell::Timestamp(ts) => format!("'{}'", ts.format(TIMESTAMP_FORMAT)),
    }
}

/// Writes a `CREATE TABLE` statement plus a bounded run of `INSERT`s.
#[derive(Debug, Clone)]
pub struct SqlGenerator {
    table_name: String,
    insert_limit: usize,
}

impl SqlGenerator {
    pub fn new(table_name: impl AsRef<str>, insert_limit: usize) -> Self {
        Self {
            table_name: normalize_identifier(table_name.as_ref()),
            insert_limit,
        }
    }

    /// The full script. A frame without columns produces an empty string.
    pub fn generate(&self, df: &DataFrame) -> Result<String> {
        if df.width() == 0 {
            return Ok(String::new());
        }

        let columns = df.get_columns();
        let definitions: Vec<String> = columns
            .iter()
            .map(|c| {
                format!(
                    "    {} {}",
                    normalize_identifier(c.name()),
                    sql_type(c.dtype())
                )
            })
            .collect();

        let mut script = format!(
            "CREATE TABLE {} (\n{}\n);\n",
            self.table_name,
            definitions.join(",\n")
        );

        let rows = df.height().min(self.insert_limit);
        let cells = frame_to_cells(&df.head(Some(rows)))?;
        for row in 0..rows {
            let values: Vec<String> = cells.iter().map(|column| sql_literal(&column[row])).collect();
            script.push_str(&format!(
                "INSERT INTO {} VALUES ({});\n",
                self.table_name,
                values.join(", ")
            ));
        }

        Ok(script)
    }
}
