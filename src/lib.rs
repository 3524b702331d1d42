//! Fetches WHO mpox case and death counts and derives the daily,
//! smoothed and per-million series published as `owid-monkeypox-data.csv`.

pub mod aggregate;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod reference;
pub mod series;
pub mod stats;
pub mod types;
