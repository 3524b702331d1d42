//! Error types for each pipeline stage.
//!
//! Every variant is fatal to a run: the caller exits non-zero and the
//! previously written CSV is left untouched.

use chrono::NaiveDate;
use thiserror::Error;

/// Failure to retrieve or parse the upstream snapshot.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid source URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("required column '{column}' missing from source header")]
    MissingColumn { column: String },

    #[error("malformed source row {row}: {reason}")]
    Malformed { row: u64, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Failure to load population, country-mapping or region reference data.
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not fetch {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: FetchError,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("population table is missing column '{column}'")]
    MissingColumn { column: String },

    #[error("invalid population value '{value}' for '{location}'")]
    InvalidPopulation { location: String, value: String },

    #[error("aggregate region '{region}' collides with a reported location")]
    RegionCollision { region: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Malformed or incomplete data found after a successful fetch.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("location '{location}' has no records")]
    EmptyLocation { location: String },

    #[error("snapshot carries neither case nor death counts")]
    MissingMetric,

    #[error("conflicting {metric} values for '{location}' on {date}: {first} vs {second}")]
    ConflictingValues {
        location: String,
        date: NaiveDate,
        metric: &'static str,
        first: f64,
        second: f64,
    },
}

/// Any failure of a full run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
