//! CLI entry point for the mpox data pipeline.
//!
//! A single invocation fetches the latest snapshot, derives the output rows
//! and rewrites the CSV. Scheduling and committing the result are left to
//! the caller.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, ValueEnum};
use mpox_data::fetch::{BasicClient, Source, WHO_SOURCE_URL};
use mpox_data::output::{OUTPUT_FILE, WriteOutcome};
use mpox_data::parser::SourceSchema;
use mpox_data::pipeline::{Options, RunConfig, run};
use mpox_data::reference::OWID_POPULATION_URL;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Column layout of the upstream CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Schema {
    /// WHO export with cumulative confirmed counts
    Who,
    /// `location,date,new_cases,new_deaths` daily deltas
    Daily,
}

impl Schema {
    fn source_schema(self) -> SourceSchema {
        match self {
            Schema::Who => SourceSchema::who(),
            Schema::Daily => SourceSchema::daily(),
        }
    }
}

#[derive(Parser)]
#[command(name = "mpox_data")]
#[command(about = "Builds the OWID mpox dataset from WHO daily counts", long_about = None)]
struct Cli {
    /// Upstream CSV endpoint
    #[arg(long, env = "MPOX_SOURCE_URL", default_value = WHO_SOURCE_URL)]
    source_url: String,

    /// WHO regions queried one at a time (empty to query the endpoint once)
    #[arg(
        long,
        env = "MPOX_WHO_REGIONS",
        value_delimiter = ',',
        default_value = "EURO,AMRO,WPRO,EMRO,AFRO,SEARO"
    )]
    regions: Vec<String>,

    /// Column layout of the upstream CSV
    #[arg(long, env = "MPOX_SCHEMA", value_enum, default_value_t = Schema::Who)]
    schema: Schema,

    /// Population CSV, local path or URL
    #[arg(long, env = "MPOX_POPULATION", default_value = OWID_POPULATION_URL)]
    population: String,

    /// JSON object mapping upstream country names to harmonized names
    /// [default: bundled data/country_mapping.json]
    #[arg(long, env = "MPOX_COUNTRY_MAPPING")]
    country_mapping: Option<String>,

    /// JSON object listing the member countries of each continental aggregate
    /// [default: bundled data/region_members.json]
    #[arg(long, env = "MPOX_REGION_MEMBERS")]
    region_members: Option<String>,

    /// CSV file to write
    #[arg(short, long, env = "MPOX_OUTPUT", default_value = OUTPUT_FILE)]
    output: PathBuf,

    /// Run date (YYYY-MM-DD); days from this date on are excluded
    #[arg(long, env = "MPOX_AS_OF")]
    as_of: Option<NaiveDate>,

    /// Drop rows before this date (YYYY-MM-DD)
    #[arg(long, env = "MPOX_START_DATE")]
    start_date: Option<NaiveDate>,

    /// Skip the World aggregate
    #[arg(long, default_value_t = false)]
    no_world: bool,

    /// HTTP request timeout in seconds
    #[arg(long, env = "MPOX_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        let regions = self
            .regions
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        RunConfig {
            source: Source {
                base_url: self.source_url,
                regions,
                schema: self.schema.source_schema(),
            },
            population: self.population,
            country_mapping: self.country_mapping,
            region_members: self.region_members,
            output: self.output,
            options: Options {
                as_of: self.as_of.unwrap_or_else(|| Utc::now().date_naive()),
                include_world: !self.no_world,
                start_date: self.start_date,
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/mpox_data.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("mpox_data.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);
    let config = cli.into_config();
    info!(
        source = %config.source.base_url,
        regions = config.source.regions.len(),
        output = %config.output.display(),
        as_of = %config.options.as_of,
        "Starting run"
    );

    let client = BasicClient::new(timeout)
        .context("failed to create HTTP client")?;

    let outcome = run(&client, &config)
        .await
        .with_context(|| format!("run failed, {} left untouched", config.output.display()))?;

    match outcome {
        WriteOutcome::Written => info!("Run complete, output updated"),
        WriteOutcome::Unchanged => info!("Run complete, output unchanged"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_schema_flag() {
        let cli = Cli::try_parse_from(["mpox_data", "--schema", "daily"]).unwrap();
        let config = cli.into_config();

        assert_eq!(config.source.schema, SourceSchema::daily());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["mpox_data", "--as-of", "2022-06-01"]).unwrap();
        let config = cli.into_config();

        assert_eq!(config.source.schema, SourceSchema::who());
        assert_eq!(config.source.regions.len(), 6);
        assert!(config.country_mapping.is_none());
        assert!(config.region_members.is_none());
        assert!(config.options.include_world);
    }
}
