use csv::ReaderBuilder;
use std::collections::HashMap;
use tracing::debug;

use crate::error::ReferenceError;

const ENTITY_COLUMN: &str = "entity";
const POPULATION_COLUMN: &str = "population";

/// Maps a location name to its population.
#[derive(Debug, Clone, Default)]
pub struct PopulationTable {
    entries: HashMap<String, f64>,
}

impl PopulationTable {
    /// Parses a CSV with at least `entity` and `population` columns.
    ///
    /// Rows with a blank population are skipped and the first row wins for
    /// duplicated entities.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, ReferenceError> {
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}') == name)
                .ok_or_else(|| ReferenceError::MissingColumn {
                    column: name.to_string(),
                })
        };
        let entity_idx = column(ENTITY_COLUMN)?;
        let population_idx = column(POPULATION_COLUMN)?;

        let mut entries = HashMap::new();
        for result in rdr.records() {
            let record = result?;
            let entity = record.get(entity_idx).unwrap_or_default();
            let raw = record.get(population_idx).unwrap_or_default();
            if entity.is_empty() || raw.is_empty() {
                continue;
            }
            let population = raw
                .parse::<f64>()
                .ok()
                .filter(|p| p.is_finite() && *p >= 0.0)
                .ok_or_else(|| ReferenceError::InvalidPopulation {
                    location: entity.to_string(),
                    value: raw.to_string(),
                })?;
            entries.entry(entity.to_string()).or_insert(population);
        }

        debug!(entities = entries.len(), "Population table loaded");
        Ok(Self { entries })
    }

    /// Returns the population for `location` if it is known and positive.
    pub fn get(&self, location: &str) -> Option<f64> {
        self.entries.get(location).copied().filter(|p| *p > 0.0)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for PopulationTable {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut entries = HashMap::new();
        for (location, population) in iter {
            entries.entry(location.into()).or_insert(population);
        }
        Self { entries }
    }
}
