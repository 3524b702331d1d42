//! World and continental aggregates built from country series.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::ReferenceError;
use crate::reference::RegionMembers;
use crate::series::DailySeries;
use crate::types::DailyPoint;

pub const WORLD: &str = "World";

/// Sums `members` day by day over the union of their calendars.
///
/// Days a member has not started reporting contribute zero. Returns `None`
/// when `members` is empty.
pub fn sum_series(location: &str, members: &[&DailySeries]) -> Option<DailySeries> {
    let start = members.iter().map(|s| s.start()).min()?;
    let end = members.iter().map(|s| s.end()).max()?;

    let mut totals: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for series in members {
        for point in series.points() {
            let entry = totals.entry(point.date).or_default();
            entry.0 += point.new_cases;
            entry.1 += point.new_deaths;
        }
    }

    let points = start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| {
            let (new_cases, new_deaths) = totals.get(&date).copied().unwrap_or_default();
            DailyPoint {
                date,
                new_cases,
                new_deaths,
            }
        })
        .collect();

    DailySeries::new(location, points)
}

/// Builds the configured aggregate series from `countries`.
///
/// Regions whose members never reported are skipped. An aggregate name that
/// is also a reported location, or a region named [`WORLD`] while the world
/// aggregate is on, is rejected.
pub fn build_aggregates(
    countries: &[DailySeries],
    regions: &RegionMembers,
    include_world: bool,
) -> Result<Vec<DailySeries>, ReferenceError> {
    let reported: HashSet<&str> = countries.iter().map(|s| s.location()).collect();
    let mut aggregates = Vec::new();

    if include_world {
        if reported.contains(WORLD) {
            return Err(ReferenceError::RegionCollision {
                region: WORLD.to_string(),
            });
        }
        let all: Vec<&DailySeries> = countries.iter().collect();
        if let Some(world) = sum_series(WORLD, &all) {
            aggregates.push(world);
        }
    }

    for (region, names) in regions.iter() {
        if reported.contains(region) || (include_world && region == WORLD) {
            return Err(ReferenceError::RegionCollision {
                region: region.to_string(),
            });
        }
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        let members: Vec<&DailySeries> = countries
            .iter()
            .filter(|s| wanted.contains(s.location()))
            .collect();

        match sum_series(region, &members) {
            Some(series) => {
                debug!(region, members = members.len(), "Region aggregated");
                aggregates.push(series);
            }
            None => debug!(region, "No reporting members, region skipped"),
        }
    }

    Ok(aggregates)
}
