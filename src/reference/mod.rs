//! Read-only reference data used by the transformer.
//!
//! [`PopulationTable`] supplies per-capita denominators, [`CountryMapping`]
//! harmonizes upstream country names and [`RegionMembers`] lists the
//! countries summed into each continental aggregate. All three are loaded
//! once per run and passed explicitly as a [`Reference`] bundle.

mod countries;
mod population;
mod regions;

pub use countries::CountryMapping;
pub use population::PopulationTable;
pub use regions::RegionMembers;

use tracing::debug;

use crate::error::ReferenceError;
use crate::fetch::{HttpClient, fetch_bytes};

/// OWID population estimates, one row per country or aggregate entity.
pub const OWID_POPULATION_URL: &str =
    "https://github.com/owid/covid-19-data/raw/master/scripts/input/un/population_latest.csv";

/// Reference tables for a single run.
#[derive(Debug, Clone, Default)]
pub struct Reference {
    pub population: PopulationTable,
    pub countries: CountryMapping,
    pub regions: RegionMembers,
}

/// Reads `path` from disk, or fetches it when it is an `http(s)` URL.
pub async fn load_input<C: HttpClient + ?Sized>(
    client: &C,
    path: &str,
) -> Result<Vec<u8>, ReferenceError> {
    debug!(path, "Loading reference input");
    if path.starts_with("http://") || path.starts_with("https://") {
        fetch_bytes(client, path)
            .await
            .map_err(|source| ReferenceError::Fetch {
                path: path.to_string(),
                source,
            })
    } else {
        std::fs::read(path).map_err(|source| ReferenceError::Io {
            path: path.to_string(),
            source,
        })
    }
}
