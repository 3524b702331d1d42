//! CSV parser for upstream case/death snapshots.

use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::FetchError;
use crate::types::{Metric, RawRecord};

/// Which upstream columns hold the location, the date and each metric.
///
/// Columns not named here are ignored, so the provider can add fields
/// without breaking the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSchema {
    pub location_column: String,
    pub date_column: String,
    pub metric_columns: Vec<(String, Metric)>,
}

impl SourceSchema {
    /// WHO `V_MPX_VALIDATED_DAILY` export: cumulative confirmed counts.
    pub fn who() -> Self {
        Self {
            location_column: "COUNTRY".to_string(),
            date_column: "DATE".to_string(),
            metric_columns: vec![
                ("TOTAL_CONF_CASES".to_string(), Metric::TotalCases),
                ("TOTAL_CONF_DEATHS".to_string(), Metric::TotalDeaths),
            ],
        }
    }

    /// Line lists already aggregated to daily deltas.
    pub fn daily() -> Self {
        Self {
            location_column: "location".to_string(),
            date_column: "date".to_string(),
            metric_columns: vec![
                ("new_cases".to_string(), Metric::NewCases),
                ("new_deaths".to_string(), Metric::NewDeaths),
            ],
        }
    }
}

/// Parses a CSV snapshot into one [`RawRecord`] per non-empty metric cell.
///
/// # Errors
///
/// Returns [`FetchError::MissingColumn`] if a column named by `schema` is
/// absent, and [`FetchError::Malformed`] for an empty location, an
/// unparsable date or a non-numeric metric value.
pub fn parse_records(bytes: &[u8], schema: &SourceSchema) -> Result<Vec<RawRecord>, FetchError> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}') == name)
            .ok_or_else(|| FetchError::MissingColumn {
                column: name.to_string(),
            })
    };

    let location_idx = column(&schema.location_column)?;
    let date_idx = column(&schema.date_column)?;
    let metric_idx = schema
        .metric_columns
        .iter()
        .map(|(name, metric)| column(name).map(|idx| (idx, *metric)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row = record.position().map_or(0, |p| p.line());

        let location = record.get(location_idx).unwrap_or_default();
        if location.is_empty() {
            return Err(FetchError::Malformed {
                row,
                reason: "empty location".to_string(),
            });
        }

        let raw_date = record.get(date_idx).unwrap_or_default();
        let date = parse_date(raw_date).ok_or_else(|| FetchError::Malformed {
            row,
            reason: format!("invalid date '{raw_date}'"),
        })?;

        for &(idx, metric) in &metric_idx {
            let cell = record.get(idx).unwrap_or_default();
            if cell.is_empty() {
                continue;
            }
            let value = cell
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| FetchError::Malformed {
                    row,
                    reason: format!("invalid {metric} value '{cell}'"),
                })?;

            out.push(RawRecord {
                location: location.to_string(),
                date,
                metric,
                value,
            });
        }
    }

    debug!(records = out.len(), "Parsed source snapshot");
    Ok(out)
}

/// Accepts `YYYY-MM-DD`, optionally followed by a `T` or space separated
/// time component which is discarded.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = match raw.find(['T', ' ']) {
        Some(pos) => &raw[..pos],
        None => raw,
    };
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
