use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::error::ReferenceError;
use crate::types::RawRecord;

const BUNDLED_PATH: &str = "data/country_mapping.json";
const BUNDLED: &[u8] = include_bytes!("../../data/country_mapping.json");

/// Maps upstream country names to harmonized names.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "United States of America": "United States",
///   "Türkiye": "Turkey"
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CountryMapping {
    entries: HashMap<String, String>,
}

impl CountryMapping {
    pub fn from_json(path: &str, bytes: &[u8]) -> Result<Self, ReferenceError> {
        let entries: HashMap<String, String> =
            serde_json::from_slice(bytes).map_err(|source| ReferenceError::Json {
                path: path.to_string(),
                source,
            })?;
        Ok(Self { entries })
    }

    /// WHO to OWID names shipped with the crate.
    pub fn bundled() -> Result<Self, ReferenceError> {
        Self::from_json(BUNDLED_PATH, BUNDLED)
    }

    /// Rewrites every record's location in place.
    pub fn apply(&self, records: &mut [RawRecord]) {
        if self.entries.is_empty() {
            return;
        }
        let mut unmapped = BTreeSet::new();
        for record in records.iter_mut() {
            match self.entries.get(&record.location) {
                Some(harmonized) => record.location.clone_from(harmonized),
                None => {
                    unmapped.insert(record.location.clone());
                }
            }
        }
        if !unmapped.is_empty() {
            debug!(count = unmapped.len(), names = ?unmapped, "Locations without a harmonized name");
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CountryMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;
    use chrono::NaiveDate;

    fn record(location: &str) -> RawRecord {
        RawRecord {
            location: location.to_string(),
            date: NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
            metric: Metric::TotalCases,
            value: 1.0,
        }
    }

    #[test]
    fn test_from_json() {
        let json = br#"{"United States of America": "United States"}"#;
        let mapping = CountryMapping::from_json("mapping.json", json).unwrap();
        let mut records = vec![record("United States of America")];
        mapping.apply(&mut records);

        assert_eq!(records[0].location, "United States");
    }

    #[test]
    fn test_bundled_mapping() {
        let mapping = CountryMapping::bundled().unwrap();
        let mut records = vec![
            record("United States of America"),
            record("Türkiye"),
            record("France"),
        ];
        mapping.apply(&mut records);

        let names: Vec<_> = records.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(names, vec!["United States", "Turkey", "France"]);
    }

    #[test]
    fn test_invalid_json() {
        let err = CountryMapping::from_json("mapping.json", b"[1, 2]").unwrap_err();
        assert!(matches!(err, ReferenceError::Json { .. }));
    }

    #[test]
    fn test_apply_rewrites_known_names_only() {
        let mapping: CountryMapping = [("Türkiye", "Turkey")].into_iter().collect();
        let mut records = vec![record("Türkiye"), record("Peru")];
        mapping.apply(&mut records);

        assert_eq!(records[0].location, "Turkey");
        assert_eq!(records[1].location, "Peru");
    }
}
