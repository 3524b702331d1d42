//! Derived statistics for a [`DailySeries`].

use crate::series::DailySeries;
use crate::types::DerivedRow;

/// Trailing window for smoothed values, in days.
pub const SMOOTHING_WINDOW: usize = 7;

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Trailing mean over at most `window` values ending at each index.
///
/// The first `window - 1` entries average over the values available so far,
/// so the output has no leading gaps.
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            mean(&values[start..=i])
        })
        .collect()
}

/// Running totals of `values`.
pub fn prefix_sum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |total, v| {
            *total += v;
            Some(*total)
        })
        .collect()
}

/// Scales `value` to a rate per million inhabitants.
pub fn per_million(value: f64, population: Option<f64>) -> Option<f64> {
    population.map(|p| value * 1_000_000.0 / p)
}

/// Derives one output row per day of `series`.
///
/// `population` is `None` when the location is missing from the
/// population table; every per-million field is then left empty.
pub fn derive_rows(series: &DailySeries, population: Option<f64>) -> Vec<DerivedRow> {
    let points = series.points();
    let new_cases: Vec<f64> = points.iter().map(|p| p.new_cases).collect();
    let new_deaths: Vec<f64> = points.iter().map(|p| p.new_deaths).collect();

    let cases_smoothed = trailing_mean(&new_cases, SMOOTHING_WINDOW);
    let deaths_smoothed = trailing_mean(&new_deaths, SMOOTHING_WINDOW);
    let total_cases = prefix_sum(&new_cases);
    let total_deaths = prefix_sum(&new_deaths);

    points
        .iter()
        .enumerate()
        .map(|(i, point)| DerivedRow {
            location: series.location().to_string(),
            date: point.date,
            new_cases: new_cases[i],
            new_deaths: new_deaths[i],
            new_cases_smoothed: cases_smoothed[i],
            new_deaths_smoothed: deaths_smoothed[i],
            new_cases_per_million: per_million(new_cases[i], population),
            new_deaths_per_million: per_million(new_deaths[i], population),
            new_cases_smoothed_per_million: per_million(cases_smoothed[i], population),
            new_deaths_smoothed_per_million: per_million(deaths_smoothed[i], population),
            total_cases: total_cases[i],
            total_deaths: total_deaths[i],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DailyPoint;
    use chrono::NaiveDate;

    fn series(cases: &[f64]) -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        let points = start
            .iter_days()
            .zip(cases)
            .map(|(date, c)| DailyPoint {
                date,
                new_cases: *c,
                new_deaths: 0.0,
            })
            .collect();
        DailySeries::new("X", points).unwrap()
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_trailing_mean_partial_window() {
        let smoothed = trailing_mean(&[7.0, 1.0, 4.0], 7);
        assert_eq!(smoothed, vec![7.0, 4.0, 4.0]);
    }

    #[test]
    fn test_trailing_mean_full_window() {
        let values: Vec<f64> = (1..=9).map(f64::from).collect();
        let smoothed = trailing_mean(&values, 7);

        assert_eq!(smoothed.len(), 9);
        assert_eq!(smoothed[6], 4.0);
        assert_eq!(smoothed[7], 5.0);
        assert_eq!(smoothed[8], 6.0);
    }

    #[test]
    fn test_prefix_sum() {
        assert_eq!(prefix_sum(&[10.0, 0.0, 5.0]), vec![10.0, 10.0, 15.0]);
    }

    #[test]
    fn test_per_million() {
        assert_eq!(per_million(5.0, Some(1_000_000.0)), Some(5.0));
        assert_eq!(per_million(1.0, Some(500_000.0)), Some(2.0));
        assert_eq!(per_million(5.0, None), None);
    }

    #[test]
    fn test_derive_rows_with_population() {
        let rows = derive_rows(&series(&[10.0, 0.0, 5.0]), Some(1_000_000.0));

        let new: Vec<_> = rows.iter().map(|r| r.new_cases).collect();
        let totals: Vec<_> = rows.iter().map(|r| r.total_cases).collect();
        let per_million: Vec<_> = rows.iter().map(|r| r.new_cases_per_million).collect();

        assert_eq!(new, vec![10.0, 0.0, 5.0]);
        assert_eq!(totals, vec![10.0, 10.0, 15.0]);
        assert_eq!(per_million, vec![Some(10.0), Some(0.0), Some(5.0)]);
        assert_eq!(rows[2].new_cases_smoothed, 5.0);
    }

    #[test]
    fn test_derive_rows_without_population() {
        let rows = derive_rows(&series(&[3.0, 1.0]), None);

        assert!(rows.iter().all(|r| r.new_cases_per_million.is_none()));
        assert!(rows.iter().all(|r| r.new_deaths_per_million.is_none()));
        assert!(rows.iter().all(|r| r.new_cases_smoothed_per_million.is_none()));
        assert!(rows.iter().all(|r| r.new_deaths_smoothed_per_million.is_none()));
        assert_eq!(rows[1].new_cases, 1.0);
    }

    #[test]
    fn test_smoothed_matches_window_mean() {
        let cases: Vec<f64> = [3, 0, 8, 1, 0, 0, 12, 4, 4, 9, 0, 2]
            .into_iter()
            .map(f64::from)
            .collect();
        let rows = derive_rows(&series(&cases), None);

        for i in 6..rows.len() {
            assert_eq!(rows[i].new_cases_smoothed, mean(&cases[i - 6..=i]));
        }
    }
}
