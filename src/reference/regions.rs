use std::collections::BTreeMap;

use crate::error::ReferenceError;

const BUNDLED_PATH: &str = "data/region_members.json";
const BUNDLED: &[u8] = include_bytes!("../../data/region_members.json");

/// Countries summed into each continental aggregate.
///
/// JSON on disk: `{ "Europe": ["France", "Spain"], "Africa": ["Nigeria"] }`.
/// A country may belong to several regions.
#[derive(Debug, Clone, Default)]
pub struct RegionMembers {
    regions: BTreeMap<String, Vec<String>>,
}

impl RegionMembers {
    pub fn from_json(path: &str, bytes: &[u8]) -> Result<Self, ReferenceError> {
        let regions = serde_json::from_slice(bytes).map_err(|source| ReferenceError::Json {
            path: path.to_string(),
            source,
        })?;
        Ok(Self { regions })
    }

    /// The six continents shipped with the crate.
    pub fn bundled() -> Result<Self, ReferenceError> {
        Self::from_json(BUNDLED_PATH, BUNDLED)
    }

    /// Iterates over `(region, members)` in region-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.regions.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for RegionMembers {
    fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
        Self {
            regions: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
