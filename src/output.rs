//! CSV serialization and persistence of derived rows.

use csv::WriterBuilder;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::types::DerivedRow;

/// Default output file name expected by the visualization.
pub const OUTPUT_FILE: &str = "owid-monkeypox-data.csv";

const SMOOTHED_DECIMALS: i32 = 2;
const CASES_PER_MILLION_DECIMALS: i32 = 3;
const DEATHS_PER_MILLION_DECIMALS: i32 = 5;

/// Output columns, in order.
pub const HEADER: [&str; 12] = [
    "location",
    "date",
    "new_cases",
    "new_deaths",
    "new_cases_smoothed",
    "new_deaths_smoothed",
    "new_cases_per_million",
    "new_deaths_per_million",
    "new_cases_smoothed_per_million",
    "new_deaths_smoothed_per_million",
    "total_cases",
    "total_deaths",
];

/// One serialized line, fields in [`HEADER`] order.
#[derive(Serialize)]
struct CsvRow<'a> {
    location: &'a str,
    date: String,
    new_cases: String,
    new_deaths: String,
    new_cases_smoothed: String,
    new_deaths_smoothed: String,
    new_cases_per_million: Option<String>,
    new_deaths_per_million: Option<String>,
    new_cases_smoothed_per_million: Option<String>,
    new_deaths_smoothed_per_million: Option<String>,
    total_cases: String,
    total_deaths: String,
}

impl<'a> From<&'a DerivedRow> for CsvRow<'a> {
    fn from(row: &'a DerivedRow) -> Self {
        let cases_rate = |v: Option<f64>| v.map(|v| format_rounded(v, CASES_PER_MILLION_DECIMALS));
        let deaths_rate =
            |v: Option<f64>| v.map(|v| format_rounded(v, DEATHS_PER_MILLION_DECIMALS));

        CsvRow {
            location: &row.location,
            date: row.date.format("%Y-%m-%d").to_string(),
            new_cases: format_number(row.new_cases),
            new_deaths: format_number(row.new_deaths),
            new_cases_smoothed: format_rounded(row.new_cases_smoothed, SMOOTHED_DECIMALS),
            new_deaths_smoothed: format_rounded(row.new_deaths_smoothed, SMOOTHED_DECIMALS),
            new_cases_per_million: cases_rate(row.new_cases_per_million),
            new_deaths_per_million: deaths_rate(row.new_deaths_per_million),
            new_cases_smoothed_per_million: cases_rate(row.new_cases_smoothed_per_million),
            new_deaths_smoothed_per_million: deaths_rate(row.new_deaths_smoothed_per_million),
            total_cases: format_number(row.total_cases),
            total_deaths: format_number(row.total_deaths),
        }
    }
}

/// Formats with `.` as decimal point, no grouping and no exponent.
/// Whole numbers have no fractional part.
pub fn format_number(value: f64) -> String {
    // Normalizes -0.0, which would otherwise print as "-0".
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value}")
}

/// Rounds half away from zero to `decimals` places before formatting.
pub fn format_rounded(value: f64, decimals: i32) -> String {
    let factor = 10f64.powi(decimals);
    format_number((value * factor).round() / factor)
}

/// Serializes `rows` in the given order, header first.
pub fn to_csv_bytes(rows: &[DerivedRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for row in rows {
        writer.serialize(CsvRow::from(row))?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Outcome of [`write_if_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Overwrites `path` with `bytes` unless it already holds exactly them.
pub fn write_if_changed(path: &Path, bytes: &[u8]) -> std::io::Result<WriteOutcome> {
    if let Ok(existing) = std::fs::read(path) {
        if existing == bytes {
            debug!(path = %path.display(), "Existing output is identical");
            return Ok(WriteOutcome::Unchanged);
        }
    }

    std::fs::write(path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "Output written");
    Ok(WriteOutcome::Written)
}
