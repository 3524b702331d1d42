//! Data types shared by the fetch, transform and output stages.

use chrono::NaiveDate;
use std::fmt;

/// The quantity an upstream observation reports.
///
/// `Total*` values are cumulative as of the observation date; `New*` values
/// are already daily deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    TotalCases,
    TotalDeaths,
    NewCases,
    NewDeaths,
}

impl Metric {
    pub fn name(self) -> &'static str {
        match self {
            Metric::TotalCases => "total_cases",
            Metric::TotalDeaths => "total_deaths",
            Metric::NewCases => "new_cases",
            Metric::NewDeaths => "new_deaths",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One observation as reported upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub location: String,
    pub date: NaiveDate,
    pub metric: Metric,
    pub value: f64,
}

/// New cases and deaths for a single calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub new_cases: f64,
    pub new_deaths: f64,
}

/// A fully derived output row.
///
/// Per-million fields are `None` when the location's population is unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    pub location: String,
    pub date: NaiveDate,
    pub new_cases: f64,
    pub new_deaths: f64,
    pub new_cases_smoothed: f64,
    pub new_deaths_smoothed: f64,
    pub new_cases_per_million: Option<f64>,
    pub new_deaths_per_million: Option<f64>,
    pub new_cases_smoothed_per_million: Option<f64>,
    pub new_deaths_smoothed_per_million: Option<f64>,
    pub total_cases: f64,
    pub total_deaths: f64,
}
