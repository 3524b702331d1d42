//! End-to-end run: fetch, transform, write.
//!
//! [`build_csv`] is the pure core: the same snapshot, reference data and
//! options always yield the same bytes. [`run`] adds the network and file
//! I/O around it.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::aggregate::build_aggregates;
use crate::error::{PipelineError, Result, TransformError};
use crate::fetch::{HttpClient, Source, fetch_source};
use crate::output::{WriteOutcome, to_csv_bytes, write_if_changed};
use crate::reference::{CountryMapping, PopulationTable, Reference, RegionMembers, load_input};
use crate::series::DailySeries;
use crate::stats::derive_rows;
use crate::types::{DerivedRow, RawRecord};

/// Knobs that change what a run emits.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// The run date; only days strictly before it are kept.
    pub as_of: NaiveDate,
    pub include_world: bool,
    /// Rows before this date are dropped after all statistics are computed.
    pub start_date: Option<NaiveDate>,
}

impl Options {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            include_world: true,
            start_date: None,
        }
    }

    /// Last day included in the output.
    pub fn cutoff(&self) -> Option<NaiveDate> {
        self.as_of.pred_opt()
    }
}

/// Turns raw records into sorted output rows.
///
/// # Errors
///
/// [`TransformError::MissingMetric`] for an empty snapshot, any error from
/// [`DailySeries::from_records`], and a region name colliding with a
/// reported location.
pub fn transform(
    mut records: Vec<RawRecord>,
    reference: &Reference,
    options: &Options,
) -> Result<Vec<DerivedRow>> {
    if records.is_empty() {
        return Err(TransformError::MissingMetric.into());
    }
    let Some(cutoff) = options.cutoff() else {
        return Ok(Vec::new());
    };

    reference.countries.apply(&mut records);

    let mut by_location: BTreeMap<String, Vec<RawRecord>> = BTreeMap::new();
    for record in records {
        by_location
            .entry(record.location.clone())
            .or_default()
            .push(record);
    }

    let mut countries = Vec::with_capacity(by_location.len());
    for (location, group) in &by_location {
        if let Some(series) = DailySeries::from_records(location, group, cutoff)? {
            countries.push(series);
        }
    }

    let aggregates = build_aggregates(&countries, &reference.regions, options.include_world)?;

    let mut missing_population = Vec::new();
    let mut rows = Vec::new();
    for series in countries.iter().chain(&aggregates) {
        let population = reference.population.get(series.location());
        if population.is_none() {
            missing_population.push(series.location());
        }
        rows.extend(
            derive_rows(series, population)
                .into_iter()
                .filter(|row| options.start_date.is_none_or(|start| row.date >= start)),
        );
    }

    if !missing_population.is_empty() {
        warn!(
            count = missing_population.len(),
            locations = ?missing_population,
            "No population for location(s), per-million values left blank"
        );
    }

    rows.sort_by(|a, b| a.location.cmp(&b.location).then(a.date.cmp(&b.date)));

    info!(
        locations = countries.len() + aggregates.len(),
        rows = rows.len(),
        %cutoff,
        "Transform complete"
    );
    Ok(rows)
}

/// Pure snapshot-to-CSV function.
pub fn build_csv(records: Vec<RawRecord>, reference: &Reference, options: &Options) -> Result<Vec<u8>> {
    let rows = transform(records, reference, options)?;
    Ok(to_csv_bytes(&rows)?)
}

/// Where a run reads from and writes to.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: Source,
    pub population: String,
    /// Falls back to [`CountryMapping::bundled`] when unset.
    pub country_mapping: Option<String>,
    /// Falls back to [`RegionMembers::bundled`] when unset.
    pub region_members: Option<String>,
    pub output: PathBuf,
    pub options: Options,
}

/// Loads the population, mapping and region tables named by `config`.
pub async fn load_reference<C: HttpClient + ?Sized>(
    client: &C,
    config: &RunConfig,
) -> Result<Reference> {
    let population = PopulationTable::from_csv(&load_input(client, &config.population).await?)?;

    let countries = match &config.country_mapping {
        Some(path) => CountryMapping::from_json(path, &load_input(client, path).await?)?,
        None => CountryMapping::bundled()?,
    };

    let regions = match &config.region_members {
        Some(path) => RegionMembers::from_json(path, &load_input(client, path).await?)?,
        None => RegionMembers::bundled()?,
    };

    Ok(Reference {
        population,
        countries,
        regions,
    })
}

/// Runs the whole pipeline once.
///
/// Nothing is written unless every stage succeeds, so a failed run leaves
/// the previous output in place.
#[tracing::instrument(skip_all, fields(output = %config.output.display(), as_of = %config.options.as_of))]
pub async fn run<C: HttpClient + ?Sized>(client: &C, config: &RunConfig) -> Result<WriteOutcome> {
    let records = fetch_source(client, &config.source).await?;
    let reference = load_reference(client, config).await?;
    let bytes = build_csv(records, &reference, &config.options)?;

    write_if_changed(&config.output, &bytes).map_err(|source| PipelineError::Write {
        path: config.output.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::WORLD;
    use crate::types::Metric;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(location: &str, date: NaiveDate, metric: Metric, value: f64) -> RawRecord {
        RawRecord {
            location: location.to_string(),
            date,
            metric,
            value,
        }
    }

    fn reference() -> Reference {
        Reference {
            population: [("X", 1_000_000.0), ("World", 8_000_000_000.0)]
                .into_iter()
                .collect(),
            ..Default::default()
        }
    }

    fn scenario() -> Vec<RawRecord> {
        vec![
            record("X", ymd(2022, 5, 1), Metric::TotalCases, 10.0),
            record("X", ymd(2022, 5, 2), Metric::TotalCases, 10.0),
            record("X", ymd(2022, 5, 3), Metric::TotalCases, 15.0),
        ]
    }

    #[test]
    fn test_cumulative_scenario() {
        let mut options = Options::new(ymd(2022, 5, 4));
        options.include_world = false;
        let rows = transform(scenario(), &reference(), &options).unwrap();

        let new: Vec<_> = rows.iter().map(|r| r.new_cases).collect();
        let totals: Vec<_> = rows.iter().map(|r| r.total_cases).collect();
        let rates: Vec<_> = rows.iter().map(|r| r.new_cases_per_million).collect();
        assert_eq!(new, vec![10.0, 0.0, 5.0]);
        assert_eq!(totals, vec![10.0, 10.0, 15.0]);
        assert_eq!(rates, vec![Some(10.0), Some(0.0), Some(5.0)]);
    }

    #[test]
    fn test_today_is_excluded() {
        let options = Options::new(ymd(2022, 5, 3));
        let rows = transform(scenario(), &reference(), &options).unwrap();

        assert!(rows.iter().all(|r| r.date < ymd(2022, 5, 3)));
        assert_eq!(rows.iter().filter(|r| r.location == "X").count(), 2);
    }

    #[test]
    fn test_rows_sorted_by_location_then_date() {
        let mut records = scenario();
        records.push(record("A", ymd(2022, 5, 2), Metric::TotalCases, 1.0));
        let rows = transform(records, &reference(), &Options::new(ymd(2022, 5, 4))).unwrap();

        let keys: Vec<_> = rows.iter().map(|r| (r.location.as_str(), r.date)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys[0], ("A", ymd(2022, 5, 2)));
        assert!(keys.iter().any(|(l, _)| *l == WORLD));
    }

    #[test]
    fn test_unknown_population_blank_rates() {
        let records = vec![record("Nowhere", ymd(2022, 5, 1), Metric::TotalCases, 3.0)];
        let rows = transform(records, &reference(), &Options::new(ymd(2022, 5, 3))).unwrap();

        let nowhere: Vec<_> = rows.iter().filter(|r| r.location == "Nowhere").collect();
        assert_eq!(nowhere.len(), 2);
        assert!(nowhere.iter().all(|r| r.new_cases_per_million.is_none()));
        assert_eq!(nowhere[0].new_cases, 3.0);
    }

    #[test]
    fn test_start_date_keeps_full_history_totals() {
        let mut options = Options::new(ymd(2022, 5, 4));
        options.start_date = Some(ymd(2022, 5, 3));
        options.include_world = false;
        let rows = transform(scenario(), &reference(), &options).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_cases, 15.0);
        assert_eq!(rows[0].new_cases_smoothed, 5.0);
    }

    #[test]
    fn test_country_mapping_merges_names() {
        let records = vec![
            record("Türkiye", ymd(2022, 5, 1), Metric::TotalCases, 3.0),
            record("Turkey", ymd(2022, 5, 2), Metric::TotalCases, 4.0),
        ];
        let reference = Reference {
            countries: [("Türkiye", "Turkey")].into_iter().collect(),
            ..Default::default()
        };
        let mut options = Options::new(ymd(2022, 5, 3));
        options.include_world = false;
        let rows = transform(records, &reference, &options).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.location == "Turkey"));
        assert_eq!(rows[1].total_cases, 4.0);
    }

    #[test]
    fn test_empty_snapshot_is_an_error() {
        let err = transform(vec![], &reference(), &Options::new(ymd(2022, 5, 3))).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Transform(TransformError::MissingMetric)
        ));
    }

    #[tokio::test]
    async fn test_reference_defaults_to_bundled_tables() {
        let config = RunConfig {
            source: Source::default(),
            population: concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/population.csv")
                .to_string(),
            country_mapping: None,
            region_members: None,
            output: PathBuf::from(crate::output::OUTPUT_FILE),
            options: Options::new(ymd(2022, 5, 3)),
        };
        let client = crate::fetch::BasicClient::new(std::time::Duration::from_secs(5)).unwrap();
        let reference = load_reference(&client, &config).await.unwrap();

        let records = vec![
            record("United States of America", ymd(2022, 5, 1), Metric::TotalCases, 2.0),
            record("Peru", ymd(2022, 5, 1), Metric::TotalCases, 1.0),
        ];
        let rows = transform(records, &reference, &config.options).unwrap();
        let mut locations: Vec<_> = rows.iter().map(|r| r.location.as_str()).collect();
        locations.dedup();

        assert_eq!(
            locations,
            vec!["North America", "Peru", "South America", "United States", "World"]
        );
    }

    #[test]
    fn test_build_csv_is_idempotent() {
        let options = Options::new(ymd(2022, 5, 6));
        let first = build_csv(scenario(), &reference(), &options).unwrap();
        let second = build_csv(scenario(), &reference(), &options).unwrap();

        assert_eq!(first, second);
    }
}
