//! Reduction of raw observations to a continuous per-location daily series.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::TransformError;
use crate::types::{DailyPoint, Metric, RawRecord};

/// One location's new cases and deaths on every day from its first report
/// to the cut-off date, with no gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    location: String,
    points: Vec<DailyPoint>,
}

impl DailySeries {
    /// Builds a series from a contiguous run of points.
    ///
    /// Returns `None` if the points are empty or skip a calendar day.
    pub fn new(location: impl Into<String>, points: Vec<DailyPoint>) -> Option<Self> {
        if points.is_empty() || !is_contiguous(&points) {
            return None;
        }
        Some(Self {
            location: location.into(),
            points,
        })
    }

    /// Reduces every record of one location to daily values ending at `end`.
    ///
    /// Records dated after `end` are ignored. Returns `Ok(None)` when no
    /// record remains, e.g. a location whose only report is from today.
    ///
    /// # Errors
    ///
    /// [`TransformError::EmptyLocation`] when `records` is empty and
    /// [`TransformError::ConflictingValues`] when one metric has two
    /// different values on the same day.
    pub fn from_records(
        location: &str,
        records: &[RawRecord],
        end: NaiveDate,
    ) -> Result<Option<Self>, TransformError> {
        if records.is_empty() {
            return Err(TransformError::EmptyLocation {
                location: location.to_string(),
            });
        }

        let mut observed: BTreeMap<Metric, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for record in records.iter().filter(|r| r.date <= end) {
            let days = observed.entry(record.metric).or_default();
            match days.get(&record.date) {
                Some(&existing) if existing != record.value => {
                    return Err(TransformError::ConflictingValues {
                        location: location.to_string(),
                        date: record.date,
                        metric: record.metric.name(),
                        first: existing,
                        second: record.value,
                    });
                }
                Some(_) => {}
                None => {
                    days.insert(record.date, record.value);
                }
            }
        }

        let new_cases = daily_values(location, &observed, true);
        let new_deaths = daily_values(location, &observed, false);

        // Only metrics that feed the series decide where it starts.
        let Some(start) = [new_cases.keys().next(), new_deaths.keys().next()]
            .into_iter()
            .flatten()
            .min()
            .copied()
        else {
            debug!(location, "No records on or before cut-off date");
            return Ok(None);
        };

        let points = start
            .iter_days()
            .take_while(|date| *date <= end)
            .map(|date| DailyPoint {
                date,
                new_cases: new_cases.get(&date).copied().unwrap_or(0.0),
                new_deaths: new_deaths.get(&date).copied().unwrap_or(0.0),
            })
            .collect();

        Ok(Some(Self {
            location: location.to_string(),
            points,
        }))
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn points(&self) -> &[DailyPoint] {
        &self.points
    }

    pub fn start(&self) -> NaiveDate {
        self.points[0].date
    }

    pub fn end(&self) -> NaiveDate {
        self.points[self.points.len() - 1].date
    }
}

/// True when every date follows its predecessor by exactly one day.
pub fn is_contiguous(points: &[DailyPoint]) -> bool {
    points
        .windows(2)
        .all(|w| w[0].date.succ_opt() == Some(w[1].date))
}

/// Daily deltas for cases (`cases == true`) or deaths.
///
/// Cumulative reports take precedence over daily ones when a location
/// carries both.
fn daily_values(
    location: &str,
    observed: &BTreeMap<Metric, BTreeMap<NaiveDate, f64>>,
    cases: bool,
) -> BTreeMap<NaiveDate, f64> {
    let (cumulative, daily) = if cases {
        (Metric::TotalCases, Metric::NewCases)
    } else {
        (Metric::TotalDeaths, Metric::NewDeaths)
    };

    if let Some(totals) = observed.get(&cumulative) {
        return cumulative_deltas(location, cumulative, totals);
    }
    match observed.get(&daily) {
        Some(values) => clamp_daily(location, daily, values),
        None => BTreeMap::new(),
    }
}

/// Converts cumulative totals to daily deltas.
///
/// A backward running minimum lowers any total that exceeds a later one, so
/// a downward correction is absorbed by the earlier reports it corrects and
/// the latest total is preserved. The first report counts in full.
pub fn cumulative_deltas(
    location: &str,
    metric: Metric,
    totals: &BTreeMap<NaiveDate, f64>,
) -> BTreeMap<NaiveDate, f64> {
    let mut corrected: Vec<(NaiveDate, f64)> =
        totals.iter().map(|(d, v)| (*d, v.max(0.0))).collect();

    let mut floor = f64::INFINITY;
    let mut lowered = 0usize;
    for (_, value) in corrected.iter_mut().rev() {
        if *value > floor {
            *value = floor;
            lowered += 1;
        } else {
            floor = *value;
        }
    }
    if lowered > 0 {
        warn!(location, %metric, lowered, "Cumulative counts decreased, earlier totals corrected");
    }

    let mut previous = 0.0;
    corrected
        .into_iter()
        .map(|(date, total)| {
            let delta = total - previous;
            previous = total;
            (date, delta)
        })
        .collect()
}

/// Negative daily values are corrections; they are clamped to zero.
fn clamp_daily(
    location: &str,
    metric: Metric,
    values: &BTreeMap<NaiveDate, f64>,
) -> BTreeMap<NaiveDate, f64> {
    let negatives = values.values().filter(|v| **v < 0.0).count();
    if negatives > 0 {
        warn!(location, %metric, negatives, "Negative daily values clamped to zero");
    }
    values.iter().map(|(d, v)| (*d, v.max(0.0))).collect()
}
