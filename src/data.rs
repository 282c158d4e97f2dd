use regex::bytes::Regex;
use serde::{Serialize, Serializer};
use std::{collections::BTreeMap, ops::AddAssign, path::PathBuf};
use thiserror::Error;

/// One line of a CSV file, already split on `;`. Kept as raw bytes: only data rows
/// need to be valid UTF-8, headers and junk lines in any encoding are skipped.
pub(crate) type Row = csv::ByteRecord;

/// Per-date partial sums held in memory between two flushes. A sorted map so that
/// the dates appended to the result file come out in a stable order.
pub(crate) type Bucket = BTreeMap<String, Sums>;

/// Names of the value columns, in file order after the date.
pub const COLUMNS: [&str; 3] = ["A", "B", "C"];

/// Header line of the result file. The leading spaces are part of the `; ` separator
/// convention of the result format.
pub const RESULT_HEADER: [&str; 4] = ["date", " A", " B", " C"];

/// The three summed columns of a date.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct Sums(pub [f64; 3]);

impl AddAssign for Sums {
    fn add_assign(&mut self, other: Self) {
        for (sum, value) in self.0.iter_mut().zip(other.0) {
            *sum += value;
        }
    }
}

/// Splits a row into its date key and its values, or `None` if it's not a data row
/// (headers, blank or malformed lines). Fields past the third value are ignored.
pub(crate) fn parse_row<'r>(
    date_pattern: &Regex,
    row: &'r Row,
) -> Result<Option<(&'r str, Sums)>, Error> {
    let date = match row.get(0) {
        Some(date) if date_pattern.is_match(date) => date,
        _ => return Ok(None),
    };
    let date = std::str::from_utf8(date)
        .map_err(|_| Error::InvalidDate(String::from_utf8_lossy(date).into_owned()))?;
    let mut sums = Sums::default();
    for (i, &column) in COLUMNS.iter().enumerate() {
        let field = row.get(i + 1).ok_or_else(|| Error::MissingField {
            date: date.to_string(),
            column,
        })?;
        sums.0[i] = std::str::from_utf8(field)
            .ok()
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| Error::InvalidNumber {
                date: date.to_string(),
                column,
                value: String::from_utf8_lossy(field).into_owned(),
            })?;
    }
    Ok(Some((date, sums)))
}

/// Compact "general float" rendering: integral values have no decimal point, others
/// use the shortest form that parses back to the same `f64`, so that re-reading a
/// result file during a merge never loses precision. Magnitudes from 1e15 up or
/// below 1e-5 switch to exponent notation.
pub(crate) fn format_general(value: f64) -> String {
    if value == 0.0 {
        // also folds -0
        return "0".to_string();
    }
    let magnitude = value.abs();
    if magnitude >= 1e15 || magnitude < 1e-5 {
        format!("{value:e}")
    } else {
        value.to_string()
    }
}

/// A line of the result file as it is serialized by the CSV writer.
#[derive(Debug, Serialize)]
pub(crate) struct ResultRow<'a> {
    pub date: &'a str,
    #[serde(serialize_with = "serialize_value")]
    pub a: f64,
    #[serde(serialize_with = "serialize_value")]
    pub b: f64,
    #[serde(serialize_with = "serialize_value")]
    pub c: f64,
}

impl<'a> ResultRow<'a> {
    pub fn new(date: &'a str, Sums([a, b, c]): Sums) -> Self {
        Self { date, a, b, c }
    }
}

fn serialize_value<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!(" {}", format_general(*value)))
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("memory limit must be at least 1 record")]
    InvalidThreshold,
    #[error("result path {0:?} does not name a file")]
    InvalidResultPath(PathBuf),
    #[error("invalid date pattern")]
    InvalidDatePattern(#[from] regex::Error),
    #[error("{0:?} is not a readable directory")]
    InvalidRoot(PathBuf),
    #[error("date {0:?} is not valid UTF-8")]
    InvalidDate(String),
    #[error("row {date} has no value for column {column}")]
    MissingField { date: String, column: &'static str },
    #[error("row {date}: column {column} is not a number ({value:?})")]
    InvalidNumber {
        date: String,
        column: &'static str,
        value: String,
    },
    #[error("CSV error")]
    Csv(#[from] csv::Error),
    #[error("cannot write result file {path:?}")]
    ResultWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
