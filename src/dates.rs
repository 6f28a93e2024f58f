//! Lenient date parsing for command-line input and seed files
//!
//! Dates arrive in whatever shape a person typed them. Each line is tried
//! against a fixed list of formats; lines that match none are skipped.

use crate::ObservationDate;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Accepted date formats, tried in order.
///
/// Two-digit years come before four-digit ones: `%Y` would happily read
/// `2/27/17` as the year 17.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%A, %B %d, %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%b-%d-%Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Errors reading a dates file
#[derive(Debug, thiserror::Error)]
pub enum DatesError {
    /// File could not be read
    #[error("Unable to process the file '{path}': {message}")]
    Unreadable {
        /// File that was requested
        path: PathBuf,
        /// Underlying IO error
        message: String,
    },
}

/// Parse one free-form date. Returns `None` for blank or unrecognised input
/// and for impossible calendar dates such as April 31.
pub fn parse_date(input: &str) -> Option<ObservationDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let date = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.date_naive())
        })?;

    Some(ObservationDate::from(date))
}

/// Parse every line that looks like a date, keeping input order
pub fn parse_dates<I, S>(lines: I) -> Vec<ObservationDate>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let line = line.as_ref();
            let parsed = parse_date(line);
            if parsed.is_none() && !line.trim().is_empty() {
                debug!(line = %line.trim(), "Ignoring unparsable date");
            }
            parsed
        })
        .collect()
}

/// Split text into lines on `\n`, `\r\n` or a lone `\r`.
///
/// A trailing line terminator does not produce an extra empty line.
pub fn read_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text
        .split("\r\n")
        .flat_map(|chunk| chunk.split(['\r', '\n']))
        .map(str::to_string)
        .collect();

    if text.ends_with(['\r', '\n']) {
        lines.pop();
    }
    if text.is_empty() {
        lines.clear();
    }
    lines
}

/// Read a file and parse every date in it
pub fn read_dates_file(path: impl AsRef<Path>) -> Result<Vec<ObservationDate>, DatesError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| DatesError::Unreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let dates = parse_dates(read_lines(&text));
    debug!(path = %path.display(), count = dates.len(), "Read dates file");
    Ok(dates)
}
